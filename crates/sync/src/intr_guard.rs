//! 中断保护器
//!
//! 基于 RAII 实现中断保护，在创建时禁用中断，销毁时恢复。
//!
//! 注意：禁用中断只能阻止**本地 CPU** 的“任务 vs 本地中断”并发，
//! 并不能阻止其他 CPU 的并行访问；多核共享数据仍需要配合自旋锁等原语。

use crate::arch_ops;

/// 中断保护器，基于 RAII 实现中断保护。
///
/// 在创建时原子地禁用中断并保存之前的状态；
/// 在销毁时自动恢复之前的中断状态。
///
/// 锁实现需要把恢复时机推迟到 unlock，此时用 [`IntrGuard::into_flags`]
/// 取出保存的状态，再由 [`IntrGuard::restore`] 显式恢复。
pub struct IntrGuard {
    flags: usize,
}

impl IntrGuard {
    /// 原子地禁用中断并返回一个 IntrGuard 实例。
    pub fn new() -> Self {
        // SAFETY: 保存的 flags 一定会在 drop 或 restore 中被恢复
        let flags = unsafe { arch_ops().read_and_disable_interrupts() };
        IntrGuard { flags }
    }

    /// 放弃自动恢复，交出进入临界区前的中断状态。
    pub fn into_flags(self) -> usize {
        let flags = self.flags;
        core::mem::forget(self);
        flags
    }

    /// 恢复由 [`IntrGuard::into_flags`] 交出的中断状态。
    ///
    /// # Safety
    /// `flags` 必须来自同一 CPU 上尚未恢复的 `into_flags`
    pub unsafe fn restore(flags: usize) {
        unsafe { arch_ops().restore_interrupts(flags) };
    }
}

impl Default for IntrGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        // SAFETY: flags 是在创建 IntrGuard 时保存的
        unsafe { arch_ops().restore_interrupts(self.flags) };
    }
}
