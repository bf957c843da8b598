//! 等待队列条目
//!
//! 一次 WAIT（或一个 futex fd）对应一个 [`FutexQ`]。条目由发起操作创建，
//! 排队期间由等待者和唤醒者共享，桶锁负责仲裁：最多只有一方真正把它从链上摘下。
//!
//! # 状态机
//!
//! ```text
//! Created -> Queued(bucket) -> Woken     （唤醒者摘下）
//!                           -> Unqueued  （等待者自己摘下：超时、信号、值不匹配）
//! ```
//!
//! 状态字替代了“所在桶锁指针”：`Queued(b)` 指明哪把桶锁管辖该条目，
//! 重排队会在持有两把桶锁时把它改写为新桶。状态字只在持有对应桶锁时以
//! `Release` 写入，等待者不持锁时以 `Acquire` 读取。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::key::KeyRef;
use crate::task::{Parker, SignalTarget};

const CREATED: usize = usize::MAX;
const WOKEN: usize = usize::MAX - 1;
const UNQUEUED: usize = usize::MAX - 2;

/// 条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// 已创建，对其他线程不可见
    Created,
    /// 挂在指定下标的哈希桶上
    Queued(usize),
    /// 已被唤醒者摘下（终态）
    Woken,
    /// 已被等待者自己摘下（终态）
    Unqueued,
}

impl QueueState {
    fn encode(self) -> usize {
        match self {
            QueueState::Created => CREATED,
            QueueState::Queued(bucket) => {
                debug_assert!(bucket < UNQUEUED);
                bucket
            }
            QueueState::Woken => WOKEN,
            QueueState::Unqueued => UNQUEUED,
        }
    }

    fn decode(raw: usize) -> Self {
        match raw {
            CREATED => QueueState::Created,
            WOKEN => QueueState::Woken,
            UNQUEUED => QueueState::Unqueued,
            bucket => QueueState::Queued(bucket),
        }
    }
}

/// 唤醒时要投递的信号
#[derive(Clone)]
pub(crate) struct SigNotify {
    target: Arc<dyn SignalTarget>,
    signo: u32,
}

impl SigNotify {
    pub(crate) fn new(target: Arc<dyn SignalTarget>, signo: u32) -> Self {
        Self { target, signo }
    }
}

/// 一个等待队列条目
pub struct FutexQ {
    state: AtomicUsize,
    /// 阻塞原语；futex fd 没有阻塞者
    parker: Option<Arc<dyn Parker>>,
    /// futex fd 注册的信号
    notify: Option<SigNotify>,
}

impl FutexQ {
    pub(crate) fn new(parker: Option<Arc<dyn Parker>>, notify: Option<SigNotify>) -> Self {
        Self {
            state: AtomicUsize::new(CREATED),
            parker,
            notify,
        }
    }

    /// 当前状态
    pub fn state(&self) -> QueueState {
        QueueState::decode(self.state.load(Ordering::Acquire))
    }

    /// 是否已被唤醒
    pub fn is_woken(&self) -> bool {
        self.state() == QueueState::Woken
    }

    /// 调用方必须持有当前（以及新的）所在桶的锁
    pub(crate) fn set_state(&self, state: QueueState) {
        self.state.store(state.encode(), Ordering::Release);
    }
}

impl fmt::Debug for FutexQ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutexQ")
            .field("state", &self.state())
            .field("has_parker", &self.parker.is_some())
            .field("signo", &self.notify.as_ref().map(|n| n.signo))
            .finish()
    }
}

/// 哈希桶链上的节点
///
/// key 及其背后对象的引用放在节点里而不是 [`FutexQ`] 里：
/// 它们只在持有桶锁时被读写（重排队会改写它们）。
pub(crate) struct QueueNode {
    pub(crate) key: KeyRef,
    pub(crate) q: Arc<FutexQ>,
}

impl QueueNode {
    pub(crate) fn is_for(&self, q: &FutexQ) -> bool {
        core::ptr::eq(Arc::as_ptr(&self.q), q)
    }
}

struct Wakeup {
    parker: Option<Arc<dyn Parker>>,
    notify: Option<SigNotify>,
}

/// 持锁期间收集的唤醒工作
///
/// 桶锁内只摘链并发布 `Woken`；unpark、投递信号以及释放 backing 引用
/// 都推迟到 [`WakeList::finish`]，调用方必须在释放所有桶锁之后调用它。
pub(crate) struct WakeList {
    wakeups: Vec<Wakeup>,
    released: Vec<QueueNode>,
    stale_refs: Vec<KeyRef>,
}

impl WakeList {
    pub(crate) fn new() -> Self {
        Self {
            wakeups: Vec::new(),
            released: Vec::new(),
            stale_refs: Vec::new(),
        }
    }

    /// 已收集的唤醒数
    pub(crate) fn len(&self) -> usize {
        self.wakeups.len()
    }

    /// 接收一个刚从链上摘下的节点（调用方仍持有其所在桶的锁）
    pub(crate) fn push(&mut self, node: QueueNode) {
        let wakeup = Wakeup {
            parker: node.q.parker.clone(),
            notify: node.q.notify.clone(),
        };
        // 发布 Woken 是对该条目的最后一次写入
        node.q.set_state(QueueState::Woken);
        self.wakeups.push(wakeup);
        self.released.push(node);
    }

    /// 记录一个要在解锁后释放的旧 key 引用（重排队时产生）
    pub(crate) fn release_later(&mut self, key: KeyRef) {
        self.stale_refs.push(key);
    }

    /// 执行唤醒并释放引用，返回唤醒数
    pub(crate) fn finish(self) -> usize {
        let count = self.wakeups.len();
        for wakeup in self.wakeups {
            if let Some(parker) = wakeup.parker {
                parker.unpark();
            }
            if let Some(notify) = wakeup.notify {
                notify.target.send_signal(notify.signo);
            }
        }
        drop(self.released);
        drop(self.stale_refs);
        count
    }
}
