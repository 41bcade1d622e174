use std::collections::HashSet;
use std::fmt;
use std::io::{self, BufRead, ErrorKind};
use std::path::Path;

use crate::cd::cd_types::{LiveSlotSet, Page as PageNo, Slot};
use crate::hm::hm_file_handler::FileHandle;
use crate::hm::hm_page::{LinePointer, Page};
use crate::hm::hm_page_compact::PageCompact;
use crate::hm::hm_page_header::PageHeader;
use crate::hm::hm_page_ops::PageOps;
use crate::logging::compact_log;

// 记录标识符：页号与行指针编号
pub type Rid = (PageNo, Slot);

// 一次清理的结果
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VacuumStats {
    pub pruned: usize,
    pub truncated_pages: u32,
}

impl fmt::Display for VacuumStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pruned={} truncated_pages={}",
            self.pruned, self.truncated_pages
        )
    }
}

// 表级管理器：插入/读取/删除/重定位/清理
pub struct HeapTable {
    handle: FileHandle,
    /// 模拟并发事务持有的行锁，被锁的记录无法被重定位
    locked: HashSet<Rid>,
    /// 数据页数上限（模拟表空间配额），达到后无法再扩展文件
    page_limit: Option<PageNo>,
}

impl HeapTable {
    pub fn create<P: AsRef<Path>>(path: P, relname: &str, page_size: usize) -> io::Result<Self> {
        Ok(Self::with_handle(FileHandle::create(path, relname, page_size)?))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::with_handle(FileHandle::open(path)?))
    }

    fn with_handle(handle: FileHandle) -> Self {
        HeapTable {
            handle,
            locked: HashSet::new(),
            page_limit: None,
        }
    }

    pub fn relname(&self) -> &str {
        &self.handle.header().relname
    }

    pub fn page_size(&self) -> usize {
        self.handle.block_size()
    }

    pub fn page_count(&self) -> PageNo {
        self.handle.data_blocks()
    }

    pub fn set_page_limit(&mut self, limit: Option<PageNo>) {
        self.page_limit = limit;
    }

    // 插入一条记录，放在编号最小且放得下的页上，没有则扩展文件
    pub fn insert(&mut self, data: &[u8]) -> io::Result<Rid> {
        let max = self.page_size() - PageHeader::SIZE - LinePointer::SIZE;
        if data.is_empty() || data.len() > max {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("record of {} bytes does not fit a page", data.len()),
            ));
        }
        for page_no in 0..self.page_count() {
            let mut page = self.load(page_no)?;
            if page.can_insert(data.len()) {
                let slot = page.insert_record(data)?;
                self.store(page_no, &page)?;
                return Ok((page_no, slot));
            }
        }
        let page_no = self.extend()?;
        let mut page = Page::empty(self.page_size());
        let slot = page.insert_record(data)?;
        self.store(page_no, &page)?;
        Ok((page_no, slot))
    }

    // 根据 Rid 读取存活记录内容
    #[cfg(test)]
    pub fn get(&mut self, rid: Rid) -> io::Result<Vec<u8>> {
        let (page_no, slot) = rid;
        let page = self.load(page_no)?;
        Ok(page.get_record(slot)?.to_vec())
    }

    // 删除指定 Rid 的记录：只打上 xmax，空间留给清理回收
    pub fn delete(&mut self, rid: Rid) -> io::Result<()> {
        let (page_no, slot) = rid;
        let mut page = self.load(page_no)?;
        let xid = self.handle.next_xid();
        page.supersede_record(slot, xid)?;
        self.store(page_no, &page)
    }

    // 原值重写一条记录：新版本写到编号最小且放得下的页（可能就是原页），
    // 写成功后旧版本才打上 xmax。被锁或已不存活的记录不受影响，返回 None。
    // 新版本写入失败时旧版本保持存活
    pub fn relocate(&mut self, rid: Rid) -> io::Result<Option<Rid>> {
        if self.locked.contains(&rid) {
            return Ok(None);
        }
        let (page_no, slot) = rid;
        let data = match self.load(page_no)?.get_record(slot) {
            Ok(data) => data.to_vec(),
            Err(e) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::InvalidInput => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };
        let new_rid = self.insert(&data)?;
        // 新版本可能落在同一页，重新读取后再标记旧版本
        let mut page = self.load(page_no)?;
        let xid = self.handle.next_xid();
        page.supersede_record(slot, xid)?;
        self.store(page_no, &page)?;
        Ok(Some(new_rid))
    }

    // 逐行读入记录（去掉行尾换行，跳过空行），返回插入的条数
    pub fn load_records<R: BufRead>(&mut self, reader: R) -> io::Result<usize> {
        let mut rows = 0;
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            self.insert(line.as_bytes())?;
            rows += 1;
        }
        compact_log!(
            log::Level::Info,
            "loaded",
            "table={} rows={} pages={}",
            self.relname(),
            rows,
            self.page_count()
        );
        Ok(rows)
    }

    // 删除页号小于 end 的全部存活记录，返回删除的条数
    pub fn delete_pages_before(&mut self, end: PageNo) -> io::Result<usize> {
        let mut deleted = 0;
        for page_no in 0..end.min(self.page_count()) {
            for slot in self.live_slots(page_no)?.iter() {
                self.delete((page_no, slot))?;
                deleted += 1;
            }
        }
        compact_log!(
            log::Level::Info,
            "deleted",
            "table={} before_page={} rows={}",
            self.relname(),
            end,
            deleted
        );
        Ok(deleted)
    }

    #[cfg(test)]
    pub fn lock(&mut self, rid: Rid) {
        self.locked.insert(rid);
    }

    #[cfg(test)]
    pub fn unlock(&mut self, rid: Rid) {
        self.locked.remove(&rid);
    }

    pub fn live_slots(&mut self, page_no: PageNo) -> io::Result<LiveSlotSet> {
        Ok(self.load(page_no)?.live_slots())
    }

    // 存活记录总数
    #[cfg(test)]
    pub fn live_rows(&mut self) -> io::Result<usize> {
        let mut total = 0;
        for page_no in 0..self.page_count() {
            total += self.live_slots(page_no)?.len();
        }
        Ok(total)
    }

    // 存储引擎自身的空间回收：清理被取代的版本并紧缩页面，
    // 然后截掉文件末尾完全空的页
    pub fn vacuum(&mut self) -> io::Result<VacuumStats> {
        let mut stats = VacuumStats::default();
        let page_size = self.page_size();
        for page_no in 0..self.page_count() {
            let mut page = self.load(page_no)?;
            let pruned = page.prune(page_size)?;
            if pruned > 0 {
                self.store(page_no, &page)?;
                stats.pruned += pruned;
            }
        }
        let mut keep = self.page_count();
        while keep > 0 && self.load(keep - 1)?.is_vacant() {
            keep -= 1;
        }
        stats.truncated_pages = self.page_count() - keep;
        if stats.truncated_pages > 0 {
            self.handle.truncate_blocks(keep + 1)?;
        }
        self.handle.flush()?;
        compact_log!(
            log::Level::Info,
            "vacuum",
            "table={} pruned={} truncated_pages={} pages={}",
            self.relname(),
            stats.pruned,
            stats.truncated_pages,
            self.page_count()
        );
        Ok(stats)
    }

    // 刷写文件头并同步
    pub fn flush(&mut self) -> io::Result<()> {
        self.handle.flush()
    }

    fn extend(&mut self) -> io::Result<PageNo> {
        if let Some(limit) = self.page_limit {
            if self.page_count() >= limit {
                return Err(io::Error::new(
                    ErrorKind::Other,
                    format!("table {} reached its limit of {} pages", self.relname(), limit),
                ));
            }
        }
        let block = self.handle.allocate_block()?;
        Ok(block - 1)
    }

    fn load(&mut self, page_no: PageNo) -> io::Result<Page> {
        let mut frame = vec![0u8; self.page_size()];
        self.handle.read_block(page_no + 1, &mut frame)?;
        Page::load(&frame)
    }

    fn store(&mut self, page_no: PageNo, page: &Page) -> io::Result<()> {
        let mut frame = vec![0u8; self.page_size()];
        page.flush(&mut frame)?;
        self.handle.write_block(page_no + 1, &frame)
    }
}
