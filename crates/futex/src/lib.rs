//! 快速用户态互斥锁（futex）核心
//!
//! 用户态在无竞争路径上只操作共享的 32 位字，只有发生竞争时才通过 futex(2)
//! 进入内核。此 crate 提供内核一侧的全部机制：
//!
//! - [`key`] - 把用户地址解析为与进程无关的 [`FutexKey`]
//! - [`bucket`] - 256 个哈希桶组成的等待队列表
//! - [`queue`] - 等待队列条目及其状态机
//! - [`FutexTable`] - WAIT / WAKE / REQUEUE / CMP_REQUEUE / FD 操作
//! - [`syscall`] - futex(2) 参数解码与分派
//!
//! # 架构解耦
//!
//! 内存管理、调度、信号与文件描述符表都通过 trait 接入：
//!
//! - [`FutexMm`] / [`FutexInode`]：地址空间与共享映射背后的文件
//! - [`Parker`]：任务的阻塞/唤醒原语
//! - [`SignalTarget`]：futex fd 的信号投递目标
//! - [`FutexTask`]：发起调用的任务
//!
//! 桶锁使用 `sync` crate 的自旋锁，使用前需通过 `sync::register_arch_ops` 注册中断开关实现。

#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod bucket;
pub mod config;
pub mod error;
pub mod fd;
pub mod jhash;
pub mod key;
pub mod mm;
pub mod queue;
pub mod syscall;
pub mod table;

mod task;

#[cfg(test)]
mod tests;

use alloc::sync::Arc;

pub use bucket::hash_futex;
pub use error::{FutexError, FutexResult};
pub use fd::FutexFd;
pub use key::{FutexKey, KeyRef, get_futex_key};
pub use mm::{FutexInode, FutexMm, VmFlags, VmaInfo};
pub use queue::{FutexQ, QueueState};
pub use syscall::{FutexCmd, do_futex, sys_futex};
pub use table::FutexTable;
pub use task::{FutexTask, ParkResult, Parker, SignalTarget};

lazy_static::lazy_static! {
    /// 全局 futex 表，系统调用路径使用
    pub static ref FUTEX_TABLE: Arc<FutexTable> = Arc::new(FutexTable::new());
}
