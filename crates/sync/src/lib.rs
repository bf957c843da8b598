//! 同步原语
//!
//! 为 futex 子系统提供两类锁：
//!
//! - [`SpinLock`]：短临界区互斥锁，持锁期间关闭本地中断，用作 futex 哈希桶锁；
//! - [`RwLock`]：读写自旋锁，不关中断，用作地址空间的 mmap 锁（读侧允许并发）。
//!
//! 两者都基于 `lock_api` 的 raw trait 实现，因此直接获得 `lock_api` 的 RAII 守卫。
//!
//! # 架构依赖
//!
//! 此 crate 通过 `ArchOps` trait 抽象中断控制。
//! 使用 [`SpinLock`] 前必须调用 `register_arch_ops` 注册实现。

#![no_std]

mod intr_guard;
mod raw_spin_lock;
mod rwlock;
mod spin_lock;

#[cfg(test)]
mod tests;

pub use intr_guard::*;
pub use raw_spin_lock::*;
pub use rwlock::*;
pub use spin_lock::*;

use core::sync::atomic::{AtomicUsize, Ordering};

/// 架构相关操作的 trait
///
/// 由内核（或测试桩）实现并注册，提供本地中断的开关能力
pub trait ArchOps: Send + Sync {
    /// 读取并禁用中断，返回之前的状态
    ///
    /// # Safety
    /// 调用者必须确保在适当的上下文中调用
    unsafe fn read_and_disable_interrupts(&self) -> usize;

    /// 恢复中断状态
    ///
    /// # Safety
    /// flags 必须是之前 read_and_disable_interrupts 返回的值
    unsafe fn restore_interrupts(&self, flags: usize);
}

/// 全局架构操作实例（存储 fat pointer 的两个部分）
static ARCH_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static ARCH_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册架构操作实现
///
/// # Safety
/// 必须在任何 [`SpinLock`] 被使用之前调用；重复注册同一实现是无害的
pub unsafe fn register_arch_ops(ops: &'static dyn ArchOps) {
    let ptr = ops as *const dyn ArchOps;
    // SAFETY: fat pointer 的布局是 (data, vtable)
    let (data, vtable) = unsafe { core::mem::transmute::<*const dyn ArchOps, (usize, usize)>(ptr) };
    ARCH_OPS_VTABLE.store(vtable, Ordering::Release);
    ARCH_OPS_DATA.store(data, Ordering::Release);
}

/// 获取架构操作实例
#[inline]
pub(crate) fn arch_ops() -> &'static dyn ArchOps {
    let data = ARCH_OPS_DATA.load(Ordering::Acquire);
    let vtable = ARCH_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        panic!("sync: ArchOps not registered, call register_arch_ops first");
    }
    // SAFETY: data 和 vtable 是通过 register_arch_ops 设置的有效指针
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn ArchOps>((data, vtable)) }
}
