use std::sync::Arc;

use sync::RwLock;

use crate::key::{FutexKey, get_futex_key};
use crate::mm::{FutexInode, FutexMm, VmFlags, VmaInfo};
use crate::{FutexError, FutexResult};

struct StubInode;

impl FutexInode for StubInode {
    fn ino(&self) -> usize {
        7
    }
}

/// 起始地址不按页对齐的线性共享映射：[0x1010, 0x3000)，起点对应文件页 4
struct UnalignedSharedMm {
    lock: RwLock<()>,
    inode: Arc<dyn FutexInode>,
}

impl FutexMm for UnalignedSharedMm {
    fn mmap_lock(&self) -> &RwLock<()> {
        &self.lock
    }

    fn find_vma(&self, _addr: usize) -> Option<VmaInfo> {
        Some(VmaInfo {
            start: 0x1010,
            end: 0x3000,
            flags: VmFlags::READ | VmFlags::MAYSHARE,
            pgoff: 4,
            file: Some(self.inode.clone()),
        })
    }

    fn follow_page(&self, _addr: usize) -> Option<usize> {
        None
    }

    fn fault_in_page(&self, _addr: usize) -> FutexResult<usize> {
        Err(FutexError::Fault)
    }

    fn load_u32(&self, _addr: usize) -> FutexResult<u32> {
        Ok(0)
    }

    fn copy_from_user(&self, _addr: usize, _buf: &mut [u8]) -> FutexResult<()> {
        Ok(())
    }
}

#[test]
fn test_shared_key_with_unaligned_vma_start() {
    super::init();
    let inode: Arc<dyn FutexInode> = Arc::new(StubInode);
    let mm: Arc<dyn FutexMm> = Arc::new(UnalignedSharedMm {
        lock: RwLock::new(()),
        inode: inode.clone(),
    });
    let ino = Arc::as_ptr(&inode).cast::<()>() as usize;

    // 映射的第一个字：所在页的页首低于 vma.start
    let first = get_futex_key(&mm, 0x1010).unwrap();
    assert_eq!(
        *first.key(),
        FutexKey::Shared {
            inode: ino,
            pgoff: 4,
            offset: 0x10,
        }
    );

    let second = get_futex_key(&mm, 0x2010).unwrap();
    assert_eq!(
        *second.key(),
        FutexKey::Shared {
            inode: ino,
            pgoff: 5,
            offset: 0x10,
        }
    );

    assert_eq!(get_futex_key(&mm, 0x1012).unwrap_err(), FutexError::InvalidAlignment);
}
