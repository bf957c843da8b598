//! 任务相关的 Mock 实现
//!
//! 每个 [`MockTask`] 对应一个宿主机线程上的内核任务：自己的 [`MockParker`]，
//! 与同进程线程共享的地址空间、信号记录和文件描述符表。

use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::time::{Duration, Instant};

use futex::{
    FutexError, FutexFd, FutexMm, FutexResult, FutexTask, ParkResult, Parker, SignalTarget,
};

use super::mm::MockAddressSpace;

/// Mock 时钟频率：1 tick = 1 ms
pub const MOCK_HZ: u64 = 1000;

static EPOCH: OnceLock<Instant> = OnceLock::new();

fn now_ticks() -> u64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_millis() as u64
}

#[derive(Default)]
struct ParkState {
    /// 未消费的唤醒令牌
    token: bool,
    /// 待处理的“信号”
    interrupted: bool,
    parks: usize,
}

/// Mock 阻塞原语：互斥锁 + 条件变量 + 一个唤醒令牌
#[derive(Default)]
pub struct MockParker {
    state: Mutex<ParkState>,
    cond: Condvar,
}

impl MockParker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 模拟一个到达的信号：打断当前（或下一次）park
    pub fn interrupt(&self) {
        self.state.lock().unwrap().interrupted = true;
        self.cond.notify_all();
    }

    /// 进入 park 的次数
    pub fn park_count(&self) -> usize {
        self.state.lock().unwrap().parks
    }
}

impl Parker for MockParker {
    fn now(&self) -> u64 {
        now_ticks()
    }

    fn ticks_per_sec(&self) -> u64 {
        MOCK_HZ
    }

    fn park(&self, deadline: Option<u64>) -> ParkResult {
        let mut state = self.state.lock().unwrap();
        state.parks += 1;
        loop {
            if state.token {
                state.token = false;
                return ParkResult::Unparked;
            }
            if state.interrupted {
                state.interrupted = false;
                return ParkResult::Interrupted;
            }
            match deadline {
                Some(deadline) => {
                    let now = now_ticks();
                    if now >= deadline {
                        return ParkResult::TimedOut;
                    }
                    let wait = Duration::from_millis(deadline - now);
                    state = self.cond.wait_timeout(state, wait).unwrap().0;
                }
                None => state = self.cond.wait(state).unwrap(),
            }
        }
    }

    fn unpark(&self) {
        self.state.lock().unwrap().token = true;
        self.cond.notify_all();
    }
}

/// Mock 信号投递目标：只记录投递过的信号
#[derive(Default)]
pub struct MockSignals {
    delivered: Mutex<Vec<u32>>,
}

impl MockSignals {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 已投递的信号（按投递顺序）
    pub fn delivered(&self) -> Vec<u32> {
        self.delivered.lock().unwrap().clone()
    }
}

impl SignalTarget for MockSignals {
    fn send_signal(&self, signo: u32) {
        self.delivered.lock().unwrap().push(signo);
    }
}

/// Mock 文件描述符表
pub struct MockFdTable {
    files: Mutex<Vec<Option<Arc<FutexFd>>>>,
    max_fds: usize,
}

impl MockFdTable {
    pub fn new(max_fds: usize) -> Arc<Self> {
        Arc::new(Self {
            files: Mutex::new(Vec::new()),
            max_fds,
        })
    }

    /// 分配最小可用的 fd
    pub fn install(&self, file: Arc<FutexFd>) -> FutexResult<usize> {
        let mut files = self.files.lock().unwrap();
        if let Some(fd) = files.iter().position(Option::is_none) {
            files[fd] = Some(file);
            return Ok(fd);
        }
        if files.len() >= self.max_fds {
            return Err(FutexError::ResourceExhausted);
        }
        files.push(Some(file));
        Ok(files.len() - 1)
    }

    pub fn get(&self, fd: usize) -> Option<Arc<FutexFd>> {
        self.files.lock().unwrap().get(fd).cloned().flatten()
    }

    /// 关闭 fd；文件在表锁之外释放
    pub fn close(&self, fd: usize) -> bool {
        let file = self
            .files
            .lock()
            .unwrap()
            .get_mut(fd)
            .and_then(Option::take);
        file.is_some()
    }
}

/// Mock 任务
#[derive(Clone)]
pub struct MockTask {
    mm: Arc<MockAddressSpace>,
    parker: Arc<MockParker>,
    signals: Arc<MockSignals>,
    fds: Arc<MockFdTable>,
}

impl MockTask {
    /// 新进程：全新的地址空间，文件描述符表上限 64
    pub fn new() -> Self {
        Self::with_mm(MockAddressSpace::new())
    }

    /// 使用给定地址空间的新进程
    pub fn with_mm(mm: Arc<MockAddressSpace>) -> Self {
        super::arch::init();
        Self {
            mm,
            parker: MockParker::new(),
            signals: MockSignals::new(),
            fds: MockFdTable::new(64),
        }
    }

    /// 同进程的另一个线程
    pub fn new_thread(&self) -> Self {
        Self {
            parker: MockParker::new(),
            ..self.clone()
        }
    }

    /// 替换文件描述符表
    pub fn with_fd_table(mut self, fds: Arc<MockFdTable>) -> Self {
        self.fds = fds;
        self
    }

    pub fn address_space(&self) -> &Arc<MockAddressSpace> {
        &self.mm
    }

    pub fn mock_parker(&self) -> &Arc<MockParker> {
        &self.parker
    }

    pub fn signals(&self) -> &Arc<MockSignals> {
        &self.signals
    }

    pub fn fds(&self) -> &Arc<MockFdTable> {
        &self.fds
    }
}

impl Default for MockTask {
    fn default() -> Self {
        Self::new()
    }
}

impl FutexTask for MockTask {
    fn mm(&self) -> Arc<dyn FutexMm> {
        self.mm.clone()
    }

    fn parker(&self) -> Arc<dyn Parker> {
        self.parker.clone()
    }

    fn signal_target(&self) -> Arc<dyn SignalTarget> {
        self.signals.clone()
    }

    fn install_fd(&self, file: Arc<FutexFd>) -> FutexResult<usize> {
        self.fds.install(file)
    }
}
