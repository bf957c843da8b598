use std::sync::Arc;
use std::thread;

use futex::config::PAGE_SIZE;
use futex::{
    FutexError, FutexFd, FutexKey, FutexMm, FutexResult, FutexTable, FutexTask, Parker,
    SignalTarget,
};
use test_support::mock::{MockFdTable, MockTask};
use test_support::{wait_for, wait_for_waiters};
use uapi::poll::PollEvents;
use uapi::signal::{NSIG, SIGIO, SIGUSR1};

const BASE: usize = 0x1000_0000;
const X: usize = BASE + 0x20;
const Y: usize = BASE + PAGE_SIZE;

fn setup() -> (Arc<FutexTable>, MockTask, FutexKey) {
    let task = MockTask::new();
    task.address_space().map_private(BASE, 4 * PAGE_SIZE);
    let table = Arc::new(FutexTable::new());
    let key = table.key_of(&task, X).unwrap();
    (table, task, key)
}

#[test]
fn test_fd_becomes_readable_on_wake() {
    let (table, task, key) = setup();

    let fd = table.register_fd(&task, X, SIGUSR1 as i32).unwrap();
    let file = task.fds().get(fd).unwrap();
    assert_eq!(file.poll(), PollEvents::empty());
    assert!(!file.is_signaled());
    assert_eq!(table.waiters(&key), 1);

    assert_eq!(table.wake(&task, X, 1), Ok(1));
    assert_eq!(file.poll(), PollEvents::POLLIN | PollEvents::POLLRDNORM);
    assert!(file.is_signaled());
    assert_eq!(task.signals().delivered(), vec![SIGUSR1]);

    // 已唤醒的条目不会再被找到
    assert_eq!(table.wake(&task, X, 1), Ok(0));
    assert_eq!(task.signals().delivered(), vec![SIGUSR1]);
}

#[test]
fn test_fd_without_signal() {
    let (table, task, _) = setup();

    let fd = table.register_fd(&task, X, 0).unwrap();
    assert_eq!(table.wake(&task, X, 1), Ok(1));
    assert!(task.fds().get(fd).unwrap().is_signaled());
    assert!(task.signals().delivered().is_empty());
}

#[test]
fn test_fd_signal_range() {
    let (table, task, key) = setup();

    assert_eq!(table.register_fd(&task, X, -1), Err(FutexError::InvalidArgument));
    assert_eq!(
        table.register_fd(&task, X, NSIG as i32 + 1),
        Err(FutexError::InvalidArgument)
    );
    assert_eq!(table.waiters(&key), 0);

    assert!(table.register_fd(&task, X, NSIG as i32).is_ok());
    assert_eq!(table.waiters(&key), 1);
}

#[test]
fn test_close_unqueues() {
    let (table, task, key) = setup();

    let fd = table.register_fd(&task, X, SIGIO as i32).unwrap();
    assert_eq!(table.waiters(&key), 1);

    assert!(task.fds().close(fd));
    assert_eq!(table.waiters(&key), 0);
    assert_eq!(table.wake(&task, X, 1), Ok(0));
    assert!(task.signals().delivered().is_empty());
}

#[test]
fn test_close_after_wake() {
    let (table, task, key) = setup();

    let fd = table.register_fd(&task, X, 0).unwrap();
    assert_eq!(table.wake(&task, X, 1), Ok(1));
    assert!(task.fds().close(fd));
    assert_eq!(table.waiters(&key), 0);
}

#[test]
fn test_fd_table_full() {
    let (table, task, key) = setup();
    let task = task.with_fd_table(MockFdTable::new(1));

    let first = table.register_fd(&task, X, 0).unwrap();
    assert_eq!(first, 0);
    assert_eq!(
        table.register_fd(&task, X, 0),
        Err(FutexError::ResourceExhausted)
    );
    assert_eq!(table.waiters(&key), 1);

    // 释放后描述符可以复用
    assert!(task.fds().close(first));
    assert_eq!(table.register_fd(&task, X, 0), Ok(0));
}

/// 安装后立即关闭描述符的任务：模拟另一个线程抢先 close 了刚分配的 fd
struct ClosingTask {
    inner: MockTask,
}

impl FutexTask for ClosingTask {
    fn mm(&self) -> Arc<dyn FutexMm> {
        self.inner.mm()
    }

    fn parker(&self) -> Arc<dyn Parker> {
        self.inner.parker()
    }

    fn signal_target(&self) -> Arc<dyn SignalTarget> {
        self.inner.signal_target()
    }

    fn install_fd(&self, file: Arc<FutexFd>) -> FutexResult<usize> {
        let fd = self.inner.install_fd(file)?;
        assert!(self.inner.fds().close(fd));
        Ok(fd)
    }
}

#[test]
fn test_fd_closed_right_after_install_leaves_no_entry() {
    let (table, task, key) = setup();
    let closing = ClosingTask {
        inner: task.clone(),
    };

    let fd = table.register_fd(&closing, X, SIGUSR1 as i32).unwrap();
    assert!(task.fds().get(fd).is_none());
    assert_eq!(table.waiters(&key), 0);

    // 真正的等待者必须拿到唤醒，而不是被已关闭的 fd 吞掉
    let waiter = {
        let table = table.clone();
        let task = task.new_thread();
        thread::spawn(move || table.wait(&task, X, 0, None))
    };
    assert!(wait_for_waiters(&table, &key, 1));
    assert_eq!(table.wake(&task, X, 1), Ok(1));
    assert_eq!(waiter.join().unwrap(), Ok(()));
    assert!(task.signals().delivered().is_empty());
}

#[test]
fn test_fd_bad_address() {
    let (table, task, _) = setup();
    assert_eq!(table.register_fd(&task, 0x10, 0), Err(FutexError::Fault));
    assert_eq!(table.register_fd(&task, X + 1, 0), Err(FutexError::InvalidAlignment));
    assert!(task.fds().get(0).is_none());
}

#[test]
fn test_fd_and_waiter_share_queue() {
    let (table, task, key) = setup();

    let fd = table.register_fd(&task, X, SIGUSR1 as i32).unwrap();
    let waiter = {
        let table = table.clone();
        let task = task.new_thread();
        thread::spawn(move || table.wait(&task, X, 0, None))
    };
    assert!(wait_for_waiters(&table, &key, 2));

    // FIFO：先注册的 fd 先被唤醒
    assert_eq!(table.wake(&task, X, 1), Ok(1));
    assert!(task.fds().get(fd).unwrap().is_signaled());
    assert!(!waiter.is_finished());

    assert_eq!(table.wake(&task, X, 1), Ok(1));
    assert_eq!(waiter.join().unwrap(), Ok(()));
}

#[test]
fn test_fd_requeued_then_woken() {
    let (table, task, key) = setup();
    let ky = table.key_of(&task, Y).unwrap();

    let fd = table.register_fd(&task, X, SIGUSR1 as i32).unwrap();
    assert_eq!(table.requeue(&task, X, Y, 0, 1, None), Ok(1));
    assert_eq!(table.waiters(&key), 0);
    assert_eq!(table.waiters(&ky), 1);
    assert!(!task.fds().get(fd).unwrap().is_signaled());

    assert_eq!(table.wake(&task, Y, 1), Ok(1));
    assert!(wait_for(|| task.signals().delivered() == vec![SIGUSR1]));
    assert!(task.fds().get(fd).unwrap().is_signaled());

    // 关闭已重排队过的 fd 也是安全的
    assert!(task.fds().close(fd));
    assert_eq!(table.waiters(&ky), 0);
}

#[test]
fn test_closing_requeued_fd_unqueues_from_new_bucket() {
    let (table, task, _) = setup();
    let ky = table.key_of(&task, Y).unwrap();

    let fd = table.register_fd(&task, X, 0).unwrap();
    assert_eq!(table.requeue(&task, X, Y, 0, 1, None), Ok(1));
    assert!(task.fds().close(fd));
    assert_eq!(table.waiters(&ky), 0);
}
