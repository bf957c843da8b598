// Host-side unit tests for the futex core.
//
// Scenarios that need an address space or real threads live in `crates/futex/tests/`
// and use the mocks from `test-support`; these only cover crate-internal pieces.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

use sync::{ArchOps, register_arch_ops};

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

/// 桶锁测试前注册中断开关桩
fn init() {
    INIT.call_once(|| unsafe { register_arch_ops(&TEST_ARCH_OPS) });
}

mod hash;
mod key;
mod queue;
