//! 关中断的原始自旋锁
//!
//! 实现 `lock_api::RawMutex`：上锁时先关本地中断再自旋，
//! 解锁时先释放锁标志再恢复中断。

use crate::intr_guard::IntrGuard;
use core::{
    hint,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// 原始自旋锁。
///
/// 不可重入。持锁者进入临界区前的中断状态保存在锁内部，
/// 因为同一时刻只有持锁者会写它。
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
    saved_flags: AtomicUsize,
}

impl RawSpinLock {
    /// 创建一个未上锁的 RawSpinLock。
    pub const fn new() -> Self {
        RawSpinLock {
            locked: AtomicBool::new(false),
            saved_flags: AtomicUsize::new(0),
        }
    }

    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl lock_api::RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinLock::new();

    // 守卫离开当前 CPU 后恢复中断状态没有意义
    type GuardMarker = lock_api::GuardNoSend;

    fn lock(&self) {
        let guard = IntrGuard::new();

        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }

        self.saved_flags
            .store(guard.into_flags(), Ordering::Relaxed);
    }

    fn try_lock(&self) -> bool {
        let guard = IntrGuard::new();
        if self.try_acquire() {
            self.saved_flags
                .store(guard.into_flags(), Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    unsafe fn unlock(&self) {
        let flags = self.saved_flags.load(Ordering::Relaxed);
        self.locked.store(false, Ordering::Release);
        // SAFETY: flags 由本次 lock/try_lock 保存
        unsafe { IntrGuard::restore(flags) };
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}
