//! futex 哈希桶
//!
//! 每个桶是一把短临界区自旋锁保护的 FIFO 链，外加一个只增不减的入队计数。
//! 需要同时持有两个桶时（重排队），按桶下标升序加锁；同一个桶只锁一次。

use alloc::collections::VecDeque;
use core::sync::atomic::{AtomicUsize, Ordering};

use sync::{SpinLock, SpinLockGuard};

use crate::config::FUTEX_HASH_BITS;
use crate::jhash::{hash_long, jhash2};
use crate::key::FutexKey;
use crate::queue::QueueNode;

/// 桶内的等待链
pub(crate) type Chain = VecDeque<QueueNode>;

/// 一个哈希桶
pub(crate) struct Bucket {
    chain: SpinLock<Chain>,
    /// 曾经进入本桶的条目数（含重排队进来的）
    nqueued: AtomicUsize,
}

impl Bucket {
    pub(crate) const fn new() -> Self {
        Self {
            chain: SpinLock::new(VecDeque::new()),
            nqueued: AtomicUsize::new(0),
        }
    }

    pub(crate) fn lock(&self) -> SpinLockGuard<'_, Chain> {
        self.chain.lock()
    }

    /// 入队计数快照，可以不持锁读取
    pub(crate) fn nqueued(&self) -> usize {
        self.nqueued.load(Ordering::Acquire)
    }

    /// 调用方持有本桶的锁
    pub(crate) fn note_enqueued(&self) {
        self.nqueued.fetch_add(1, Ordering::Release);
    }
}

/// key 所在的桶下标
///
/// 对 key 的标签与身份字做 jhash2，页内偏移作为扰动，再折叠到 `FUTEX_HASH_BITS` 位。
pub fn hash_futex(key: &FutexKey) -> usize {
    let words = key.hash_words();
    hash_long(jhash2(&words, key.offset()) as u64, FUTEX_HASH_BITS)
}

/// 同时持有的两个桶锁
///
/// 桶锁会保存并恢复中断状态，必须按加锁的逆序释放：
/// `Distinct` 中 `second` 声明在前，因而先于 `first` 被 drop。
pub(crate) enum LockedPair<'a> {
    /// 源与目标是同一个桶
    Same(SpinLockGuard<'a, Chain>),
    /// 源与目标是不同的桶
    Distinct {
        second: SpinLockGuard<'a, Chain>,
        first: SpinLockGuard<'a, Chain>,
        src_first: bool,
    },
}

impl LockedPair<'_> {
    /// 源链与（不同时的）目标链
    pub(crate) fn chains(&mut self) -> (&mut Chain, Option<&mut Chain>) {
        match self {
            LockedPair::Same(chain) => (&mut **chain, None),
            LockedPair::Distinct {
                second,
                first,
                src_first,
            } => {
                if *src_first {
                    (&mut **first, Some(&mut **second))
                } else {
                    (&mut **second, Some(&mut **first))
                }
            }
        }
    }
}

/// 按下标升序锁住 `src` 与 `dst` 两个桶
pub(crate) fn lock_pair(buckets: &[Bucket], src: usize, dst: usize) -> LockedPair<'_> {
    if src == dst {
        return LockedPair::Same(buckets[src].lock());
    }
    let (lo, hi) = if src < dst { (src, dst) } else { (dst, src) };
    let first = buckets[lo].lock();
    let second = buckets[hi].lock();
    LockedPair::Distinct {
        second,
        first,
        src_first: src < dst,
    }
}
