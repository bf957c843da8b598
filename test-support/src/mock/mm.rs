//! 内存管理相关操作的 Mock 实现
//!
//! [`MockAddressSpace`] 模拟一个进程的地址空间：若干 VMA，以及按页存放的 32 位字。
//! 匿名私有映射的页属于地址空间本身；共享映射的页属于 [`MockInode`]，
//! 因此不同地址空间映射同一文件页时看到的是同一份数据。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futex::config::PAGE_SIZE;
use futex::{FutexError, FutexInode, FutexMm, FutexResult, VmFlags, VmaInfo};
use sync::RwLock;

const WORDS_PER_PAGE: usize = PAGE_SIZE / 4;

/// 一页内存
struct Page {
    words: Box<[AtomicU32]>,
}

impl Page {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            words: (0..WORDS_PER_PAGE).map(|_| AtomicU32::new(0)).collect(),
        })
    }

    fn word(&self, addr: usize) -> &AtomicU32 {
        &self.words[(addr % PAGE_SIZE) / 4]
    }
}

static NEXT_INO: AtomicUsize = AtomicUsize::new(1);

/// Mock 文件：按文件页号保存页
pub struct MockInode {
    ino: usize,
    pages: Mutex<HashMap<usize, Arc<Page>>>,
}

impl MockInode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ino: NEXT_INO.fetch_add(1, Ordering::Relaxed),
            pages: Mutex::new(HashMap::new()),
        })
    }

    fn page(&self, pgoff: usize) -> Arc<Page> {
        self.pages
            .lock()
            .unwrap()
            .entry(pgoff)
            .or_insert_with(Page::new)
            .clone()
    }
}

impl FutexInode for MockInode {
    fn ino(&self) -> usize {
        self.ino
    }
}

struct MockVma {
    start: usize,
    end: usize,
    flags: VmFlags,
    pgoff: usize,
    file: Option<Arc<MockInode>>,
    /// 非线性映射：每个虚拟页对应的文件页号
    nonlinear: Option<Vec<usize>>,
}

impl MockVma {
    fn file_pgoff(&self, addr: usize) -> usize {
        let index = (addr - self.start) / PAGE_SIZE;
        match &self.nonlinear {
            Some(pgoffs) => pgoffs[index],
            None => self.pgoff + index,
        }
    }
}

/// Mock 地址空间
pub struct MockAddressSpace {
    mmap_lock: RwLock<()>,
    vmas: Mutex<Vec<MockVma>>,
    anon: Mutex<HashMap<usize, Arc<Page>>>,
    /// 非线性映射中已调入的虚拟页
    resident: Mutex<HashSet<usize>>,
    fail_faults: Mutex<bool>,
    faults: AtomicUsize,
}

impl MockAddressSpace {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            mmap_lock: RwLock::new(()),
            vmas: Mutex::new(Vec::new()),
            anon: Mutex::new(HashMap::new()),
            resident: Mutex::new(HashSet::new()),
            fail_faults: Mutex::new(false),
            faults: AtomicUsize::new(0),
        })
    }

    fn map(&self, vma: MockVma) {
        assert_eq!(vma.start % PAGE_SIZE, 0);
        assert_eq!(vma.end % PAGE_SIZE, 0);
        let _mmap = self.mmap_lock.write();
        self.vmas.lock().unwrap().push(vma);
    }

    /// 匿名私有可读写映射
    pub fn map_private(&self, start: usize, len: usize) {
        self.map(MockVma {
            start,
            end: start + len,
            flags: VmFlags::READ | VmFlags::WRITE,
            pgoff: 0,
            file: None,
            nonlinear: None,
        });
    }

    /// 文件的 MAP_SHARED 可读写映射，`start` 对应文件页 `pgoff`
    pub fn map_shared(&self, start: usize, len: usize, file: &Arc<MockInode>, pgoff: usize) {
        self.map(MockVma {
            start,
            end: start + len,
            flags: VmFlags::READ | VmFlags::WRITE | VmFlags::SHARED | VmFlags::MAYSHARE,
            pgoff,
            file: Some(file.clone()),
            nonlinear: None,
        });
    }

    /// 非线性共享映射：第 i 个虚拟页映射文件页 `pgoffs[i]`，初始时都不在内存中
    pub fn map_nonlinear(&self, start: usize, file: &Arc<MockInode>, pgoffs: &[usize]) {
        self.map(MockVma {
            start,
            end: start + pgoffs.len() * PAGE_SIZE,
            flags: VmFlags::READ
                | VmFlags::WRITE
                | VmFlags::SHARED
                | VmFlags::MAYSHARE
                | VmFlags::NONLINEAR,
            pgoff: pgoffs.first().copied().unwrap_or(0),
            file: Some(file.clone()),
            nonlinear: Some(pgoffs.to_vec()),
        });
    }

    /// I/O 映射
    pub fn map_io(&self, start: usize, len: usize) {
        self.map(MockVma {
            start,
            end: start + len,
            flags: VmFlags::READ | VmFlags::WRITE | VmFlags::IO,
            pgoff: 0,
            file: None,
            nonlinear: None,
        });
    }

    /// 只写（不可读）的映射
    pub fn map_unreadable(&self, start: usize, len: usize) {
        self.map(MockVma {
            start,
            end: start + len,
            flags: VmFlags::WRITE,
            pgoff: 0,
            file: None,
            nonlinear: None,
        });
    }

    /// 之后的缺页处理全部失败
    pub fn set_fault_failure(&self, fail: bool) {
        *self.fail_faults.lock().unwrap() = fail;
    }

    /// 完整缺页处理的次数
    pub fn fault_count(&self) -> usize {
        self.faults.load(Ordering::SeqCst)
    }

    /// 模拟一次成功的访问把页调入
    pub fn touch(&self, addr: usize) {
        self.resident.lock().unwrap().insert(addr - addr % PAGE_SIZE);
    }

    fn page_for(&self, addr: usize) -> FutexResult<Arc<Page>> {
        let vmas = self.vmas.lock().unwrap();
        let vma = vmas
            .iter()
            .find(|vma| (vma.start..vma.end).contains(&addr))
            .ok_or(FutexError::Fault)?;
        match (&vma.file, vma.flags.contains(VmFlags::MAYSHARE)) {
            (Some(file), true) => Ok(file.page(vma.file_pgoff(addr))),
            _ => Ok(self
                .anon
                .lock()
                .unwrap()
                .entry(addr - addr % PAGE_SIZE)
                .or_insert_with(Page::new)
                .clone()),
        }
    }

    /// 用户态写入一个字
    pub fn store(&self, addr: usize, val: u32) {
        let page = self.page_for(addr).expect("store to unmapped address");
        page.word(addr).store(val, Ordering::SeqCst);
    }

    /// 用户态读取一个字
    pub fn load(&self, addr: usize) -> u32 {
        let page = self.page_for(addr).expect("load from unmapped address");
        page.word(addr).load(Ordering::SeqCst)
    }

    /// 用户态写入任意字节
    pub fn write_bytes(&self, addr: usize, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            let at = addr + i;
            let shift = (at % 4) * 8;
            let page = self.page_for(at).expect("write to unmapped address");
            let _ = page
                .word(at)
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |w| {
                    Some((w & !(0xff << shift)) | ((byte as u32) << shift))
                });
        }
    }
}

impl FutexMm for MockAddressSpace {
    fn mmap_lock(&self) -> &RwLock<()> {
        &self.mmap_lock
    }

    fn find_vma(&self, addr: usize) -> Option<VmaInfo> {
        let vmas = self.vmas.lock().unwrap();
        vmas.iter()
            .find(|vma| vma.end > addr && vma.start <= addr)
            .map(|vma| VmaInfo {
                start: vma.start,
                end: vma.end,
                flags: vma.flags,
                pgoff: vma.pgoff,
                file: vma
                    .file
                    .clone()
                    .map(|file| file as Arc<dyn FutexInode>),
            })
    }

    fn follow_page(&self, addr: usize) -> Option<usize> {
        let page = addr - addr % PAGE_SIZE;
        if !self.resident.lock().unwrap().contains(&page) {
            return None;
        }
        let vmas = self.vmas.lock().unwrap();
        vmas.iter()
            .find(|vma| (vma.start..vma.end).contains(&addr))
            .map(|vma| vma.file_pgoff(addr))
    }

    fn fault_in_page(&self, addr: usize) -> FutexResult<usize> {
        self.faults.fetch_add(1, Ordering::SeqCst);
        if *self.fail_faults.lock().unwrap() {
            return Err(FutexError::Fault);
        }
        let pgoff = {
            let vmas = self.vmas.lock().unwrap();
            vmas.iter()
                .find(|vma| (vma.start..vma.end).contains(&addr))
                .map(|vma| vma.file_pgoff(addr))
                .ok_or(FutexError::Fault)?
        };
        self.touch(addr);
        Ok(pgoff)
    }

    fn load_u32(&self, addr: usize) -> FutexResult<u32> {
        let page = self.page_for(addr)?;
        Ok(page.word(addr).load(Ordering::SeqCst))
    }

    fn copy_from_user(&self, addr: usize, buf: &mut [u8]) -> FutexResult<()> {
        for (i, byte) in buf.iter_mut().enumerate() {
            let at = addr + i;
            let word = self.page_for(at)?.word(at).load(Ordering::SeqCst);
            *byte = (word >> ((at % 4) * 8)) as u8;
        }
        Ok(())
    }
}
