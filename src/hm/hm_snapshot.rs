use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::Path;

use memmap2::Mmap;

use crate::cd::cd_types::{LiveSlotSet, Page as PageNo};
use crate::hm::hm_file_header::FileHeader;
use crate::hm::hm_page::Page;

/// 堆文件的只读映射，反映映射时刻每个页的原始内容
pub struct HeapSnapshot {
    map: Mmap,
    header: FileHeader,
}

impl HeapSnapshot {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        // 映射期间文件只会被同一进程内的主库会话按块改写或在清理时截断，
        // 快照在每次读取后即释放
        let map = unsafe { Mmap::map(&file)? };
        let header = FileHeader::from_bytes(&map)?;
        let needed = header.block_count as u64 * header.block_size as u64;
        if (map.len() as u64) < needed {
            return Err(io::Error::new(ErrorKind::InvalidData, "heap file shorter than its header claims"));
        }
        Ok(Self { map, header })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn page_count(&self) -> PageNo {
        self.header.page_count()
    }

    // 解析第 page 个数据页（块号 page + 1）
    pub fn page(&self, page: PageNo) -> io::Result<Page> {
        if page >= self.page_count() {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("page {} out of range ({} pages)", page, self.page_count()),
            ));
        }
        let block_size = self.header.block_size as usize;
        let start = (page as usize + 1) * block_size;
        Page::load(&self.map[start..start + block_size])
    }

    pub fn live_slots(&self, page: PageNo) -> io::Result<LiveSlotSet> {
        Ok(self.page(page)?.live_slots())
    }
}
