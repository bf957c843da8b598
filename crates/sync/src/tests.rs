// Host-side unit tests for the lock primitives.

extern crate std;

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::thread;
use std::vec::Vec;

use crate::{ArchOps, RwLock, SpinLock, register_arch_ops};

struct TestArchOps {
    enabled: AtomicBool,
}

impl ArchOps for TestArchOps {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        self.enabled.swap(false, Ordering::SeqCst) as usize
    }

    unsafe fn restore_interrupts(&self, flags: usize) {
        self.enabled.store(flags != 0, Ordering::SeqCst);
    }
}

static TEST_ARCH_OPS: TestArchOps = TestArchOps {
    enabled: AtomicBool::new(true),
};

static INIT: Once = Once::new();

fn init() {
    INIT.call_once(|| unsafe { register_arch_ops(&TEST_ARCH_OPS) });
}

#[test]
fn test_spin_lock_restores_interrupts() {
    init();
    let lock = SpinLock::new(0u32);
    {
        let mut guard = lock.lock();
        *guard += 1;
        assert!(lock.is_locked());
    }
    assert!(!lock.is_locked());
    assert_eq!(*lock.lock(), 1);
}

#[test]
fn test_spin_lock_try_lock_contended() {
    init();
    let lock = SpinLock::new(());
    let guard = lock.lock();
    assert!(lock.try_lock().is_none());
    drop(guard);
    assert!(lock.try_lock().is_some());
}

#[test]
fn test_spin_lock_mutual_exclusion() {
    init();
    let lock = Arc::new(SpinLock::new(0usize));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lock = lock.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    *lock.lock() += 1;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*lock.lock(), 4000);
}

#[test]
fn test_rwlock_readers_share() {
    let lock = RwLock::new(7);
    let r1 = lock.read();
    let r2 = lock.read();
    assert_eq!(*r1 + *r2, 14);
    assert!(lock.try_write().is_none());
    drop(r1);
    drop(r2);
    *lock.write() = 8;
    assert_eq!(*lock.read(), 8);
}

#[test]
fn test_rwlock_writer_excludes_readers() {
    let lock = RwLock::new(());
    let w = lock.write();
    assert!(lock.is_locked());
    assert!(lock.try_read().is_none());
    drop(w);
    assert!(lock.try_read().is_some());
}
