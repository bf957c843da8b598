//! 调度与任务接口
//!
//! futex 需要调用方任务提供：阻塞/唤醒原语（[`Parker`]）、
//! 信号投递目标（[`SignalTarget`]）以及文件描述符表的安装能力。

use alloc::sync::Arc;

use crate::{FutexFd, FutexMm, FutexResult};

/// [`Parker::park`] 的返回原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkResult {
    /// 被 [`Parker::unpark`] 唤醒（也可能是残留的唤醒令牌）
    Unparked,
    /// 到达截止时间
    TimedOut,
    /// 有待处理的信号
    Interrupted,
}

/// 任务的阻塞原语
///
/// `unpark` 在 `park` 之前发生时不能丢失：下一次 `park` 必须立即返回。
/// 时间单位为 tick。
pub trait Parker: Send + Sync {
    /// 当前时间（tick）
    fn now(&self) -> u64;

    /// 每秒 tick 数
    fn ticks_per_sec(&self) -> u64;

    /// 阻塞当前任务，直到被唤醒、到达绝对截止时间 `deadline` 或被信号打断
    fn park(&self, deadline: Option<u64>) -> ParkResult;

    /// 唤醒阻塞在该原语上的任务
    fn unpark(&self);
}

/// 异步信号的投递目标（futex fd 的属主进程）
pub trait SignalTarget: Send + Sync {
    /// 投递信号
    fn send_signal(&self, signo: u32);
}

/// 发起 futex 调用的任务
pub trait FutexTask {
    /// 当前任务所属的地址空间
    fn mm(&self) -> Arc<dyn FutexMm>;

    /// 当前任务的阻塞原语
    fn parker(&self) -> Arc<dyn Parker>;

    /// 当前进程的信号投递目标
    fn signal_target(&self) -> Arc<dyn SignalTarget>;

    /// 把 futex 文件安装到当前进程的文件描述符表，返回 fd
    fn install_fd(&self, file: Arc<FutexFd>) -> FutexResult<usize>;
}
