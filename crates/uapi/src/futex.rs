//! Futex 系统调用常量。
//!
//! 这些常量对应于 Linux 内核的 futex(2) 系统调用操作码。

/// 类型定义：用于 Futex 系统调用操作码。
pub type FutexOp = u32;

/// 等待操作：如果 futex 地址处的值等于 val，则线程进入休眠。
pub const FUTEX_WAIT: FutexOp = 0;

/// 唤醒操作：唤醒至多 val 个等待在 futex 地址处的线程。
pub const FUTEX_WAKE: FutexOp = 1;

/// 文件描述符操作：创建一个在 futex 被唤醒时变为可读（并可选发送信号）的 fd。
pub const FUTEX_FD: FutexOp = 2;

/// 重排队操作：唤醒 val 个线程，并将至多 val2 个线程从 uaddr 重新排队到 uaddr2。
pub const FUTEX_REQUEUE: FutexOp = 3;

/// 比较并重排队操作：类似于 REQUEUE，但在重排队前检查 uaddr 处的值是否等于 val3。
pub const FUTEX_CMP_REQUEUE: FutexOp = 4;
