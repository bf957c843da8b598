//! futex 子系统的编译期配置

/// 哈希桶数量的位数
pub const FUTEX_HASH_BITS: u32 = 8;

/// 哈希桶数量
pub const FUTEX_HASH_SIZE: usize = 1 << FUTEX_HASH_BITS;

/// 页大小
pub const PAGE_SIZE: usize = 4096;
