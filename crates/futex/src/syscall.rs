//! futex(2) 系统调用入口
//!
//! 把原始寄存器参数解码为 [`FutexCmd`] 再分派到 [`FutexTable`]。
//! 对 REQUEUE/CMP_REQUEUE，`utime` 参数位承载的是整数 `val2`（重排队上限），而不是指针。

use alloc::sync::Arc;

use log::trace;
use uapi::futex::*;
use uapi::time::TimeSpec;

use crate::table::FutexTable;
use crate::task::FutexTask;
use crate::{FUTEX_TABLE, FutexError, FutexResult};

/// 解码后的 futex 命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutexCmd {
    /// FUTEX_WAIT，`timeout` 为相对 tick 数
    Wait {
        /// 期望值
        val: u32,
        /// 超时（tick），`None` 表示无限等待
        timeout: Option<u64>,
    },
    /// FUTEX_WAKE
    Wake {
        /// 最多唤醒的条目数
        nr_wake: usize,
    },
    /// FUTEX_FD
    Fd {
        /// 唤醒时投递的信号，0 表示不投递
        signo: i32,
    },
    /// FUTEX_REQUEUE / FUTEX_CMP_REQUEUE
    Requeue {
        /// 目标 futex 地址
        uaddr2: usize,
        /// 最多唤醒的条目数
        nr_wake: usize,
        /// 最多移动的条目数
        nr_requeue: usize,
        /// CMP_REQUEUE 的期望值
        cmpval: Option<u32>,
    },
}

/// 计数参数按有符号整数解释，负数视为 0
fn count_arg(raw: u32) -> usize {
    (raw as i32).max(0) as usize
}

impl FutexCmd {
    /// 解码 futex(2) 的参数
    pub fn decode(
        task: &dyn FutexTask,
        op: FutexOp,
        val: u32,
        utime: usize,
        uaddr2: usize,
        val3: u32,
    ) -> FutexResult<Self> {
        let cmd = match op {
            FUTEX_WAIT => FutexCmd::Wait {
                val,
                timeout: read_timeout(task, utime)?,
            },
            FUTEX_WAKE => FutexCmd::Wake {
                nr_wake: count_arg(val),
            },
            FUTEX_FD => FutexCmd::Fd { signo: val as i32 },
            FUTEX_REQUEUE | FUTEX_CMP_REQUEUE => FutexCmd::Requeue {
                uaddr2,
                nr_wake: count_arg(val),
                nr_requeue: count_arg(utime as u32),
                cmpval: (op == FUTEX_CMP_REQUEUE).then_some(val3),
            },
            _ => return Err(FutexError::NotImplemented),
        };
        Ok(cmd)
    }
}

/// 从用户内存读取相对超时并换算为 tick
///
/// 空指针表示无限等待。换算结果额外加一个 tick，保证至少等满给定时长。
pub fn read_timeout(task: &dyn FutexTask, utime: usize) -> FutexResult<Option<u64>> {
    if utime == 0 {
        return Ok(None);
    }
    let mut raw = [0u8; 16];
    task.mm().copy_from_user(utime, &mut raw)?;
    let ts = TimeSpec::from_bytes(&raw);
    if !ts.is_valid() {
        return Err(FutexError::InvalidArgument);
    }
    let hz = task.parker().ticks_per_sec();
    Ok(Some(ts.to_ticks(hz).saturating_add(1)))
}

/// 在指定的表上执行一次 futex 调用
#[allow(clippy::too_many_arguments)]
pub fn do_futex(
    table: &Arc<FutexTable>,
    task: &dyn FutexTask,
    uaddr: usize,
    op: FutexOp,
    val: u32,
    utime: usize,
    uaddr2: usize,
    val3: u32,
) -> FutexResult<usize> {
    match FutexCmd::decode(task, op, val, utime, uaddr2, val3)? {
        FutexCmd::Wait { val, timeout } => table.wait(task, uaddr, val, timeout).map(|()| 0),
        FutexCmd::Wake { nr_wake } => table.wake(task, uaddr, nr_wake),
        FutexCmd::Fd { signo } => table.register_fd(task, uaddr, signo),
        FutexCmd::Requeue {
            uaddr2,
            nr_wake,
            nr_requeue,
            cmpval,
        } => table.requeue(task, uaddr, uaddr2, nr_wake, nr_requeue, cmpval),
    }
}

/// futex(2)：使用全局表，返回非负结果或负的错误码
pub fn sys_futex(
    task: &dyn FutexTask,
    uaddr: usize,
    op: FutexOp,
    val: u32,
    utime: usize,
    uaddr2: usize,
    val3: u32,
) -> isize {
    let ret = match do_futex(&FUTEX_TABLE, task, uaddr, op, val, utime, uaddr2, val3) {
        Ok(n) => n as isize,
        Err(err) => err.to_errno(),
    };
    trace!("sys_futex(uaddr={:#x}, op={}, val={}) = {}", uaddr, op, val, ret);
    ret
}
