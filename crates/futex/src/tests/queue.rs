use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::vec::Vec;

use crate::key::KeyRef;
use crate::queue::{FutexQ, QueueNode, QueueState, SigNotify, WakeList};
use crate::task::{ParkResult, Parker, SignalTarget};

#[derive(Default)]
struct CountingParker {
    unparks: AtomicUsize,
}

impl Parker for CountingParker {
    fn now(&self) -> u64 {
        0
    }

    fn ticks_per_sec(&self) -> u64 {
        1000
    }

    fn park(&self, _deadline: Option<u64>) -> ParkResult {
        ParkResult::Unparked
    }

    fn unpark(&self) {
        self.unparks.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingTarget {
    signals: Mutex<Vec<u32>>,
}

impl SignalTarget for RecordingTarget {
    fn send_signal(&self, signo: u32) {
        self.signals.lock().unwrap().push(signo);
    }
}

#[test]
fn test_state_roundtrip() {
    let q = FutexQ::new(None, None);
    assert_eq!(q.state(), QueueState::Created);
    for state in [
        QueueState::Queued(0),
        QueueState::Queued(255),
        QueueState::Woken,
        QueueState::Unqueued,
    ] {
        q.set_state(state);
        assert_eq!(q.state(), state);
    }
}

#[test]
fn test_is_woken() {
    let q = FutexQ::new(None, None);
    q.set_state(QueueState::Queued(3));
    assert!(!q.is_woken());
    q.set_state(QueueState::Woken);
    assert!(q.is_woken());
}

#[test]
fn test_wake_list_defers_work() {
    let parker = Arc::new(CountingParker::default());
    let target = Arc::new(RecordingTarget::default());
    let waiter = Arc::new(FutexQ::new(Some(parker.clone()), None));
    let fd_entry = Arc::new(FutexQ::new(None, Some(SigNotify::new(target.clone(), 10))));

    let key = dummy_key();
    let mut list = WakeList::new();
    for q in [&waiter, &fd_entry] {
        q.set_state(QueueState::Queued(1));
        list.push(QueueNode {
            key: key.clone(),
            q: q.clone(),
        });
    }

    // 发布 Woken 在 push 时完成，唤醒动作推迟到 finish
    assert!(waiter.is_woken() && fd_entry.is_woken());
    assert_eq!(parker.unparks.load(Ordering::SeqCst), 0);
    assert!(target.signals.lock().unwrap().is_empty());

    assert_eq!(list.len(), 2);
    assert_eq!(list.finish(), 2);
    assert_eq!(parker.unparks.load(Ordering::SeqCst), 1);
    assert_eq!(*target.signals.lock().unwrap(), [10]);
    // 节点持有的条目引用已全部释放
    assert_eq!(Arc::strong_count(&waiter), 1);
    assert_eq!(Arc::strong_count(&fd_entry), 1);
}

#[test]
fn test_node_identity() {
    let a = Arc::new(FutexQ::new(None, None));
    let b = Arc::new(FutexQ::new(None, None));
    let node = QueueNode {
        key: dummy_key(),
        q: a.clone(),
    };
    assert!(node.is_for(&a));
    assert!(!node.is_for(&b));
}

fn dummy_key() -> KeyRef {
    super::bucket::private_key_ref(0x4000)
}
