//! Mock 实现模块
//!
//! 提供架构、内存管理与任务相关的 Mock 实现，用于测试

pub mod arch;
pub mod mm;
pub mod task;

pub use arch::MOCK_ARCH_OPS;
pub use mm::{MockAddressSpace, MockInode};
pub use task::{MOCK_HZ, MockFdTable, MockParker, MockSignals, MockTask};
