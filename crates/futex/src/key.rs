//! Futex key 解析
//!
//! 把 (用户虚拟地址, 地址空间) 映射为与具体线程/进程无关的 [`FutexKey`]：
//!
//! - 私有映射：key 为 (地址空间, 页对齐地址, 页内偏移)，不需要查页；
//! - 共享映射：key 为 (文件, 文件页号, 页内偏移)，因此不同进程在不同虚拟地址
//!   映射同一共享页时得到相同的 key。
//!
//! 解析结果 [`KeyRef`] 同时持有背后对象（地址空间或文件）的强引用，
//! 条目排队期间该引用随队列节点一起保存，出队后在桶锁之外释放。

use alloc::sync::Arc;
use core::fmt;
use core::mem::size_of;

use log::debug;

use crate::config::PAGE_SIZE;
use crate::mm::{FutexInode, FutexMm, VmFlags};
use crate::{FutexError, FutexResult};

/// futex 字的规范身份
///
/// 身份字段是背后对象 `Arc` 的分配地址，相等性和哈希都只基于这些逻辑字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FutexKey {
    /// 私有映射中的 futex
    Private {
        /// 地址空间身份
        mm: usize,
        /// 页对齐的虚拟地址
        page: usize,
        /// 页内字节偏移
        offset: u32,
    },
    /// 共享映射中的 futex
    Shared {
        /// 文件身份
        inode: usize,
        /// 文件内页号
        pgoff: usize,
        /// 页内字节偏移
        offset: u32,
    },
}

impl FutexKey {
    /// 页内字节偏移（总是 4 的倍数）
    pub fn offset(&self) -> u32 {
        match *self {
            FutexKey::Private { offset, .. } | FutexKey::Shared { offset, .. } => offset,
        }
    }

    /// 是否为共享 key
    pub fn is_shared(&self) -> bool {
        matches!(self, FutexKey::Shared { .. })
    }

    /// 参与哈希的 32 位字：类型标签、身份、位置（各拆成高低两半）
    pub(crate) fn hash_words(&self) -> [u32; 5] {
        let (tag, id, pos) = match *self {
            FutexKey::Private { mm, page, .. } => (0u32, mm as u64, page as u64),
            FutexKey::Shared { inode, pgoff, .. } => (1u32, inode as u64, pgoff as u64),
        };
        [
            tag,
            id as u32,
            (id >> 32) as u32,
            pos as u32,
            (pos >> 32) as u32,
        ]
    }
}

/// key 背后的对象
#[derive(Clone)]
pub(crate) enum Backing {
    Mm(Arc<dyn FutexMm>),
    Inode(Arc<dyn FutexInode>),
}

/// 解析好的 key，以及它背后对象的一份强引用
#[derive(Clone)]
pub struct KeyRef {
    key: FutexKey,
    backing: Backing,
}

impl KeyRef {
    /// key 本身
    pub fn key(&self) -> &FutexKey {
        &self.key
    }
}

impl fmt::Debug for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("KeyRef");
        s.field("key", &self.key);
        match &self.backing {
            Backing::Mm(mm) => s.field("mm", &format_args!("{:#x}", identity(mm))),
            Backing::Inode(inode) => s.field("ino", &inode.ino()),
        };
        s.finish()
    }
}

fn identity<T: ?Sized>(obj: &Arc<T>) -> usize {
    Arc::as_ptr(obj).cast::<()>() as usize
}

/// 解析 `uaddr` 的 futex key
///
/// 调用方必须持有 `mm.mmap_lock()` 的读侧，并在获取任何桶锁之前完成本调用。
/// 非线性共享映射可能触发缺页处理；缺页失败按 [`FutexError::Fault`] 返回，不重试。
pub fn get_futex_key(mm: &Arc<dyn FutexMm>, uaddr: usize) -> FutexResult<KeyRef> {
    let offset = uaddr % PAGE_SIZE;
    if offset % size_of::<u32>() != 0 {
        return Err(FutexError::InvalidAlignment);
    }
    let page = uaddr - offset;
    let offset = offset as u32;

    let vma = mm
        .find_vma(uaddr)
        .filter(|vma| vma.contains(uaddr))
        .ok_or(FutexError::Fault)?;

    if vma.flags & (VmFlags::IO | VmFlags::READ) != VmFlags::READ {
        return Err(if vma.flags.contains(VmFlags::IO) {
            FutexError::PermissionDenied
        } else {
            FutexError::AccessDenied
        });
    }

    if !vma.flags.contains(VmFlags::MAYSHARE) {
        return Ok(KeyRef {
            key: FutexKey::Private {
                mm: identity(mm),
                page,
                offset,
            },
            backing: Backing::Mm(mm.clone()),
        });
    }

    let inode = vma.file.clone().ok_or(FutexError::Fault)?;

    let pgoff = if !vma.flags.contains(VmFlags::NONLINEAR) {
        (uaddr - vma.start) / PAGE_SIZE + vma.pgoff
    } else {
        match mm.follow_page(uaddr) {
            Some(pgoff) => pgoff,
            None => {
                debug!("futex: {:#x} not resident in nonlinear mapping, faulting in", uaddr);
                mm.fault_in_page(uaddr).map_err(|err| {
                    debug!("futex: fault-in of {:#x} failed: {:?}", uaddr, err);
                    FutexError::Fault
                })?
            }
        }
    };

    Ok(KeyRef {
        key: FutexKey::Shared {
            inode: identity(&inode),
            pgoff,
            offset,
        },
        backing: Backing::Inode(inode),
    })
}
