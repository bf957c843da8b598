//! Futex 错误类型
//!
//! 定义 futex 操作可能返回的错误，可通过 [`FutexError::to_errno()`] 转换为系统调用错误码。

use uapi::errno::*;

/// Futex 错误类型
///
/// 所有错误都只作用于单次调用，不会在子系统内部重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutexError {
    // 参数相关
    /// 地址未按 4 字节对齐 (-EINVAL)
    InvalidAlignment,
    /// 无效参数，例如信号编号越界或超时格式错误 (-EINVAL)
    InvalidArgument,

    // 地址解析相关
    /// 地址不在任何映射中，或共享映射的页无法调入 (-EFAULT)
    Fault,
    /// 映射为 I/O 映射，不允许用于 futex (-EPERM)
    PermissionDenied,
    /// 映射存在但不可读 (-EACCES)
    AccessDenied,

    // WAIT 结果
    /// 等待前检查到的值与期望值不同 (-EWOULDBLOCK)
    WouldBlock,
    /// 等待超时 (-ETIMEDOUT)
    TimedOut,
    /// 被信号打断 (-EINTR)
    Interrupted,

    // 其他
    /// CMP_REQUEUE 检查失败，调用方应重新读取后重试 (-EAGAIN)
    Retry,
    /// 未知操作码 (-ENOSYS)
    NotImplemented,
    /// 文件描述符或内存耗尽 (-EMFILE)
    ResourceExhausted,
}

impl FutexError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        let errno = match self {
            FutexError::InvalidAlignment | FutexError::InvalidArgument => EINVAL,
            FutexError::Fault => EFAULT,
            FutexError::PermissionDenied => EPERM,
            FutexError::AccessDenied => EACCES,
            FutexError::WouldBlock => EWOULDBLOCK,
            FutexError::TimedOut => ETIMEDOUT,
            FutexError::Interrupted => EINTR,
            FutexError::Retry => EAGAIN,
            FutexError::NotImplemented => ENOSYS,
            FutexError::ResourceExhausted => EMFILE,
        };
        -(errno as isize)
    }
}

impl core::fmt::Display for FutexError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            FutexError::InvalidAlignment => "futex address is not 4-byte aligned",
            FutexError::InvalidArgument => "invalid futex argument",
            FutexError::Fault => "bad futex address",
            FutexError::PermissionDenied => "futex on I/O mapping",
            FutexError::AccessDenied => "futex mapping is not readable",
            FutexError::WouldBlock => "futex value changed",
            FutexError::TimedOut => "futex wait timed out",
            FutexError::Interrupted => "futex wait interrupted",
            FutexError::Retry => "futex changed during requeue",
            FutexError::NotImplemented => "unknown futex operation",
            FutexError::ResourceExhausted => "out of futex resources",
        };
        f.write_str(msg)
    }
}

/// futex 操作的结果类型
pub type FutexResult<T> = Result<T, FutexError>;
