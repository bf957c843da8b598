//! 地址空间接口
//!
//! futex 子系统不直接依赖内存管理实现，只通过本模块的 trait 访问：
//!
//! - [`FutexMm`]：一个进程的地址空间（VMA 查找、页查找/缺页、用户内存读取）
//! - [`FutexInode`]：共享映射背后的文件对象
//!
//! 两者都以 `Arc` 形式出现，其分配地址即为 futex key 中的身份标识；
//! 条目排队期间持有的 `Arc` 保证该身份不会被复用。

use alloc::sync::Arc;
use bitflags::bitflags;
use sync::RwLock;

use crate::FutexResult;

bitflags! {
    /// VMA 标志（取值与 Linux `VM_*` 一致）
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VmFlags: u32 {
        /// 可读
        const READ = 0x0000_0001;
        /// 可写
        const WRITE = 0x0000_0002;
        /// 可执行
        const EXEC = 0x0000_0004;
        /// 共享且可写
        const SHARED = 0x0000_0008;
        /// 可共享（MAP_SHARED），决定 key 的类型
        const MAYSHARE = 0x0000_0080;
        /// I/O 映射，不允许 futex
        const IO = 0x0000_4000;
        /// 非线性文件映射（remap_file_pages），文件偏移不能由虚拟地址直接算出
        const NONLINEAR = 0x0080_0000;
    }
}

/// 共享映射背后的文件对象
pub trait FutexInode: Send + Sync {
    /// inode 编号（仅用于日志）
    fn ino(&self) -> usize;
}

/// 覆盖某个地址的映射区域快照
#[derive(Clone)]
pub struct VmaInfo {
    /// 起始虚拟地址（页对齐）
    pub start: usize,
    /// 结束虚拟地址（不含，页对齐）
    pub end: usize,
    /// 映射标志
    pub flags: VmFlags,
    /// `start` 对应的文件页号
    pub pgoff: usize,
    /// 背后的文件（匿名私有映射为 `None`）
    pub file: Option<Arc<dyn FutexInode>>,
}

impl VmaInfo {
    /// 地址是否落在该区域内
    pub fn contains(&self, addr: usize) -> bool {
        (self.start..self.end).contains(&addr)
    }
}

// 手动实现 Debug，因为 dyn FutexInode 没有实现 Debug
impl core::fmt::Debug for VmaInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VmaInfo")
            .field("start", &format_args!("{:#x}", self.start))
            .field("end", &format_args!("{:#x}", self.end))
            .field("flags", &self.flags)
            .field("pgoff", &self.pgoff)
            .field("file", &self.file.as_ref().map(|f| f.ino()))
            .finish()
    }
}

/// 进程地址空间
///
/// 除 [`FutexMm::mmap_lock`] 外，其余方法都要求调用方持有 mmap 锁的读侧。
pub trait FutexMm: Send + Sync {
    /// 地址空间的映射锁；futex 只会获取读侧
    fn mmap_lock(&self) -> &RwLock<()>;

    /// 查找覆盖 `addr` 的映射区域
    fn find_vma(&self, addr: usize) -> Option<VmaInfo>;

    /// 不触发缺页地查找 `addr` 当前所在页的文件页号；页不在内存中时返回 `None`
    fn follow_page(&self, addr: usize) -> Option<usize>;

    /// 完整的缺页处理（可能阻塞、分配内存或读盘），返回调入页的文件页号
    fn fault_in_page(&self, addr: usize) -> FutexResult<usize>;

    /// 对用户地址做一次原子的 4 字节读取
    fn load_u32(&self, addr: usize) -> FutexResult<u32>;

    /// 从用户地址复制字节
    fn copy_from_user(&self, addr: usize, buf: &mut [u8]) -> FutexResult<()>;
}
