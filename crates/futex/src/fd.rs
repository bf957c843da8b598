//! futex 文件描述符（FUTEX_FD）
//!
//! 在 futex 字上注册一个不阻塞的等待条目：唤醒时可选地向属主进程投递信号，
//! 之后文件变为可读。关闭文件（最后一个引用释放）时若条目仍在队列中则将其摘下。

use alloc::sync::Arc;
use core::fmt;

use log::debug;
use uapi::poll::PollEvents;
use uapi::signal::NSIG;

use crate::key::get_futex_key;
use crate::queue::{FutexQ, SigNotify};
use crate::table::FutexTable;
use crate::task::FutexTask;
use crate::{FutexError, FutexResult};

/// futex fd 背后的文件对象
pub struct FutexFd {
    table: Arc<FutexTable>,
    q: Arc<FutexQ>,
}

impl FutexFd {
    /// 就绪事件：条目被唤醒后可读
    pub fn poll(&self) -> PollEvents {
        if self.q.is_woken() {
            PollEvents::POLLIN | PollEvents::POLLRDNORM
        } else {
            PollEvents::empty()
        }
    }

    /// 是否已被唤醒
    pub fn is_signaled(&self) -> bool {
        self.q.is_woken()
    }
}

impl Drop for FutexFd {
    fn drop(&mut self) {
        if self.table.unqueue(&self.q) {
            debug!("futex: fd closed while still queued");
        }
    }
}

impl fmt::Debug for FutexFd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutexFd").field("q", &self.q).finish()
    }
}

impl FutexTable {
    /// FUTEX_FD：在 `uaddr` 上注册一个 futex fd，返回新分配的描述符
    ///
    /// `signo` 为 0 表示唤醒时不投递信号。描述符安装失败或被立即关闭时不会留下任何条目。
    pub fn register_fd(
        self: &Arc<Self>,
        task: &dyn FutexTask,
        uaddr: usize,
        signo: i32,
    ) -> FutexResult<usize> {
        let signo = u32::try_from(signo)
            .ok()
            .filter(|&signo| signo as usize <= NSIG)
            .ok_or(FutexError::InvalidArgument)?;

        let mm = task.mm();
        let _mmap = mm.mmap_lock().read();
        let key = get_futex_key(&mm, uaddr)?;

        let notify = (signo != 0).then(|| SigNotify::new(task.signal_target(), signo));
        let q = Arc::new(FutexQ::new(None, notify));
        let file = Arc::new(FutexFd {
            table: self.clone(),
            q: q.clone(),
        });

        // 先入队再安装：fd 一旦可见就可能被其他线程关闭，Drop 必须能摘下条目。
        // 安装失败时 file 被释放，同样由 Drop 摘下
        self.queue(&q, key);
        let fd = task.install_fd(file)?;
        debug!("futex: fd {} registered on {:#x} (signo {})", fd, uaddr, signo);
        Ok(fd)
    }
}
