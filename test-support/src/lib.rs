//! 测试支持 crate
//!
//! 为 futex 的集成测试提供宿主机上的 Mock 实现：地址空间、任务、阻塞原语、
//! 信号与文件描述符表，以及少量等待辅助函数。

pub mod mock;

use std::thread;
use std::time::{Duration, Instant};

use futex::{FutexKey, FutexTable};

/// 轮询条件的最长时间
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// 轮询直到 `cond` 成立，超过 [`POLL_TIMEOUT`] 返回 `false`
pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < POLL_TIMEOUT {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// 等待 `key` 上恰好挂着 `n` 个条目
pub fn wait_for_waiters(table: &FutexTable, key: &FutexKey, n: usize) -> bool {
    wait_for(|| table.waiters(key) == n)
}
