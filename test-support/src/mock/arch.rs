//! 架构相关操作的 Mock 实现

use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use sync::{ArchOps, register_arch_ops};

/// Mock 架构操作
///
/// 中断状态只是一个全局标志；宿主机线程共享它，只用于让桶锁的保存/恢复路径可执行。
pub struct MockArchOps {
    pub interrupt_state: AtomicBool,
}

impl MockArchOps {
    pub const fn new() -> Self {
        Self {
            interrupt_state: AtomicBool::new(true),
        }
    }
}

impl Default for MockArchOps {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchOps for MockArchOps {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        self.interrupt_state.swap(false, Ordering::SeqCst) as usize
    }

    unsafe fn restore_interrupts(&self, flags: usize) {
        self.interrupt_state.store(flags != 0, Ordering::SeqCst);
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();

static INIT: Once = Once::new();

/// 注册 [`MOCK_ARCH_OPS`]，可重复调用
pub fn init() {
    // SAFETY: 注册的是 'static 实例，且只注册一次
    INIT.call_once(|| unsafe { register_arch_ops(&MOCK_ARCH_OPS) });
}
