//! futex 哈希表与核心操作
//!
//! [`FutexTable`] 持有固定数量的哈希桶，WAIT/WAKE/REQUEUE 都以它为上下文。
//! 内核使用全局实例 [`FUTEX_TABLE`](crate::FUTEX_TABLE)，测试可以各自创建独立实例。
//!
//! # 锁顺序
//!
//! mmap 锁（读侧）→ 桶锁（多个桶时按下标升序）。futex fd 在入队、释放桶锁之后
//! 才安装到文件描述符表。
//! 桶锁内不做任何可能阻塞的事：不访问用户内存、不 unpark、不投递信号、
//! 不释放 backing 引用。

use alloc::sync::Arc;

use log::{debug, trace, warn};

use crate::bucket::{Bucket, hash_futex, lock_pair};
use crate::config::FUTEX_HASH_SIZE;
use crate::key::{FutexKey, KeyRef, get_futex_key};
use crate::queue::{FutexQ, QueueNode, QueueState, WakeList};
use crate::task::{FutexTask, ParkResult};
use crate::{FutexError, FutexResult};

/// futex 哈希表
pub struct FutexTable {
    buckets: [Bucket; FUTEX_HASH_SIZE],
}

impl FutexTable {
    /// 创建一张空表
    pub fn new() -> Self {
        Self {
            buckets: [const { Bucket::new() }; FUTEX_HASH_SIZE],
        }
    }

    /// 解析 `uaddr` 在 `task` 地址空间中的 key（只返回 key，不保留引用）
    pub fn key_of(&self, task: &dyn FutexTask, uaddr: usize) -> FutexResult<FutexKey> {
        let mm = task.mm();
        let _mmap = mm.mmap_lock().read();
        get_futex_key(&mm, uaddr).map(|key| *key.key())
    }

    /// 当前挂在 `key` 上的条目数
    pub fn waiters(&self, key: &FutexKey) -> usize {
        let chain = self.buckets[hash_futex(key)].lock();
        chain.iter().filter(|node| node.key.key() == key).count()
    }

    /// 把所有非空桶的内容打到日志里
    pub fn dump(&self) {
        for (idx, bucket) in self.buckets.iter().enumerate() {
            let chain = bucket.lock();
            for node in chain.iter() {
                warn!("futex bucket {}: {:?} is still waiting on {:?}", idx, node.q, node.key);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn bucket(&self, idx: usize) -> &Bucket {
        &self.buckets[idx]
    }

    /// 入队：`key` 携带的 backing 引用在加锁之前就已获取
    pub(crate) fn queue(&self, q: &Arc<FutexQ>, key: KeyRef) {
        let idx = hash_futex(key.key());
        let bucket = &self.buckets[idx];
        let mut chain = bucket.lock();
        q.set_state(QueueState::Queued(idx));
        chain.push_back(QueueNode { key, q: q.clone() });
        bucket.note_enqueued();
    }

    /// 等待者把自己从桶里摘下
    ///
    /// 返回 `true` 表示确实是本次调用摘下的；返回 `false` 表示条目已被唤醒
    /// （或从未入队），此时不能再碰链表。
    pub(crate) fn unqueue(&self, q: &FutexQ) -> bool {
        let node = loop {
            let idx = match q.state() {
                QueueState::Queued(idx) => idx,
                _ => return false,
            };
            let mut chain = self.buckets[idx].lock();
            // 读状态和加锁之间可能被重排队到别的桶，或者被唤醒
            if q.state() != QueueState::Queued(idx) {
                drop(chain);
                continue;
            }
            let node = match chain.iter().position(|node| node.is_for(q)) {
                Some(pos) => chain.remove(pos),
                None => {
                    warn!("futex: {:?} missing from bucket {}", q, idx);
                    None
                }
            };
            q.set_state(QueueState::Unqueued);
            break node;
        };
        // backing 引用在桶锁之外释放
        drop(node);
        true
    }

    /// FUTEX_WAIT：若 `*uaddr == val` 则阻塞，直到被唤醒、超时（`timeout` 个 tick）或被信号打断
    pub fn wait(
        &self,
        task: &dyn FutexTask,
        uaddr: usize,
        val: u32,
        timeout: Option<u64>,
    ) -> FutexResult<()> {
        let mm = task.mm();
        let parker = task.parker();
        let q = Arc::new(FutexQ::new(Some(parker.clone()), None));

        {
            let _mmap = mm.mmap_lock().read();
            let key = get_futex_key(&mm, uaddr)?;
            self.queue(&q, key);

            // 必须先入队再读值：先改值后唤醒的一方要么看到我们在队里，要么我们看到新值
            let checked = match mm.load_u32(uaddr) {
                Ok(cur) if cur == val => Ok(()),
                Ok(_) => Err(FutexError::WouldBlock),
                Err(_) => Err(FutexError::Fault),
            };
            if let Err(err) = checked {
                return if self.unqueue(&q) { Err(err) } else { Ok(()) };
            }
        }

        let deadline = timeout.map(|ticks| parker.now().saturating_add(ticks));
        loop {
            if q.is_woken() {
                return Ok(());
            }
            let err = match parker.park(deadline) {
                ParkResult::Unparked => {
                    if !q.is_woken() {
                        trace!("futex: spurious unpark on {:#x}", uaddr);
                    }
                    continue;
                }
                ParkResult::TimedOut => FutexError::TimedOut,
                ParkResult::Interrupted => FutexError::Interrupted,
            };
            // 与超时/信号并发到达的唤醒优先
            return if self.unqueue(&q) { Err(err) } else { Ok(()) };
        }
    }

    /// FUTEX_WAKE：按 FIFO 顺序唤醒至多 `nr_wake` 个等待在 `uaddr` 上的条目
    pub fn wake(&self, task: &dyn FutexTask, uaddr: usize, nr_wake: usize) -> FutexResult<usize> {
        let mm = task.mm();
        let key = {
            let _mmap = mm.mmap_lock().read();
            get_futex_key(&mm, uaddr)?
        };

        let mut woken = WakeList::new();
        if nr_wake > 0 {
            let mut chain = self.buckets[hash_futex(key.key())].lock();
            let mut i = 0;
            while i < chain.len() {
                if chain[i].key.key() != key.key() {
                    i += 1;
                    continue;
                }
                if let Some(node) = chain.remove(i) {
                    woken.push(node);
                }
                if woken.len() >= nr_wake {
                    break;
                }
            }
        }

        let count = woken.finish();
        trace!("futex: wake {:#x} -> {}", uaddr, count);
        Ok(count)
    }

    /// FUTEX_REQUEUE / FUTEX_CMP_REQUEUE
    ///
    /// 唤醒 `uaddr1` 上的前 `nr_wake` 个条目，把随后至多 `nr_requeue` 个条目移到 `uaddr2`。
    /// 给出 `cmpval` 时先确认 `*uaddr1 == cmpval` 且源桶在检查期间没有新条目入队，
    /// 否则返回 [`FutexError::Retry`] 且不改动任何条目。返回唤醒数与移动数之和。
    pub fn requeue(
        &self,
        task: &dyn FutexTask,
        uaddr1: usize,
        uaddr2: usize,
        nr_wake: usize,
        nr_requeue: usize,
        cmpval: Option<u32>,
    ) -> FutexResult<usize> {
        let mm = task.mm();
        let (key1, key2) = {
            let _mmap = mm.mmap_lock().read();
            (get_futex_key(&mm, uaddr1)?, get_futex_key(&mm, uaddr2)?)
        };
        let src = hash_futex(key1.key());
        let dst = hash_futex(key2.key());

        // 读用户内存不能在桶锁内进行：先记下源桶计数再读值，加锁后复查计数
        let snapshot = match cmpval {
            Some(expected) => {
                let nqueued = self.buckets[src].nqueued();
                let cur = {
                    let _mmap = mm.mmap_lock().read();
                    mm.load_u32(uaddr1).map_err(|_| FutexError::Fault)?
                };
                Some((nqueued, cur == expected))
            }
            None => None,
        };

        let mut woken = WakeList::new();
        let mut requeued = 0;
        {
            let mut pair = lock_pair(&self.buckets, src, dst);

            if let Some((nqueued, value_matches)) = snapshot {
                if !value_matches || self.buckets[src].nqueued() != nqueued {
                    debug!(
                        "futex: cmp_requeue {:#x} retry (value matches: {})",
                        uaddr1, value_matches
                    );
                    return Err(FutexError::Retry);
                }
            }

            let (src_chain, mut dst_chain) = pair.chains();
            // 只扫描加锁时已在链上的节点：自重排队时被移到链尾的节点不会再被访问
            let mut end = src_chain.len();
            let mut i = 0;
            while i < end && (woken.len() < nr_wake || requeued < nr_requeue) {
                if src_chain[i].key.key() != key1.key() {
                    i += 1;
                    continue;
                }
                let Some(mut node) = src_chain.remove(i) else {
                    break;
                };
                end -= 1;

                if woken.len() < nr_wake {
                    woken.push(node);
                    continue;
                }

                let old = core::mem::replace(&mut node.key, key2.clone());
                node.q.set_state(QueueState::Queued(dst));
                match dst_chain.as_deref_mut() {
                    Some(chain) => chain.push_back(node),
                    None => src_chain.push_back(node),
                }
                self.buckets[dst].note_enqueued();
                woken.release_later(old);
                requeued += 1;
            }
        }

        let count = woken.finish();
        debug!(
            "futex: requeue {:#x} -> {:#x}: woke {}, moved {}",
            uaddr1, uaddr2, count, requeued
        );
        Ok(count + requeued)
    }
}

impl Default for FutexTable {
    fn default() -> Self {
        Self::new()
    }
}
