//! 时间相关的用户态结构

/// 每秒纳秒数
pub const NSEC_PER_SEC: i64 = 1_000_000_000;

/// 对应 Linux 的 `struct timespec`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeSpec {
    pub tv_sec: i64,
    pub tv_nsec: i64,
}

impl TimeSpec {
    /// 从原始字节（小端，与用户态内存布局一致）构造
    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        let mut sec = [0u8; 8];
        let mut nsec = [0u8; 8];
        sec.copy_from_slice(&bytes[..8]);
        nsec.copy_from_slice(&bytes[8..]);
        TimeSpec {
            tv_sec: i64::from_le_bytes(sec),
            tv_nsec: i64::from_le_bytes(nsec),
        }
    }

    /// 是否为合法的相对时间（非负，且纳秒部分小于一秒）
    pub fn is_valid(&self) -> bool {
        self.tv_sec >= 0 && (0..NSEC_PER_SEC).contains(&self.tv_nsec)
    }

    /// 按给定的时钟频率换算为 tick 数（向上取整，溢出时饱和）
    ///
    /// 调用方需先用 [`TimeSpec::is_valid`] 校验。
    pub fn to_ticks(&self, ticks_per_sec: u64) -> u64 {
        let hz = ticks_per_sec as u128;
        let whole = self.tv_sec as u128 * hz;
        let frac = (self.tv_nsec as u128 * hz).div_ceil(NSEC_PER_SEC as u128);
        u64::try_from(whole + frac).unwrap_or(u64::MAX)
    }
}
