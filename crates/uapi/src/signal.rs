//! 信号编号

/// 信号总数（合法信号编号为 1..=NSIG）
pub const NSIG: usize = 64;

pub const SIGIO: u32 = 29;
pub const SIGUSR1: u32 = 10;
pub const SIGUSR2: u32 = 12;
