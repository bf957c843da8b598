//! 自旋锁封装
//!
//! 提供对数据的互斥访问的自旋锁类型。
//!
//! # 示例
//! ```ignore
//! let lock = SpinLock::new(0);
//! {
//!     let mut guard = lock.lock(); // 获取锁，禁用中断
//!     *guard += 1;
//! } // 离开作用域，释放锁并恢复中断状态
//! ```
//!
//! # 注意
//! SpinLock 不是可重入的，且持锁期间中断被关闭，
//! 因此不要在持锁时执行可能阻塞的操作（缺页、睡眠、唤醒其他任务等）。

use crate::raw_spin_lock::RawSpinLock;

/// 提供对数据的互斥访问的自旋锁。
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// SpinLock 的 RAII 保护器，离开作用域时自动释放锁。
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;
