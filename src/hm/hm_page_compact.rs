use crate::hm::hm_page::{LinePointer, Page};
use crate::hm::hm_page_header::PageHeader;
use std::io::{self, ErrorKind};

// 页面清理：把已被取代的版本变成未使用的槽，再把有效记录移动到数据区前部，
// 槽编号保持不变（行指针是外部可见的物理地址），末尾连续的未使用槽截掉
pub trait PageCompact {
    /// 返回本次清理掉的版本数
    fn prune(&mut self, page_size: usize) -> io::Result<usize>;
}

impl PageCompact for Page {
    fn prune(&mut self, page_size: usize) -> io::Result<usize> {
        let mut pruned = 0;
        for lp in self.slots.iter_mut() {
            if lp.is_used() && lp.xmax != 0 {
                *lp = LinePointer::default();
                pruned += 1;
            }
        }
        // 截掉末尾的未使用槽
        while self.slots.last().map_or(false, |lp| !lp.is_used()) {
            self.slots.pop();
        }

        // 新数据区
        let mut new_data = Vec::with_capacity(self.data.len());
        for lp in self.slots.iter_mut() {
            if !lp.is_used() {
                *lp = LinePointer::default();
                continue;
            } // 跳过空槽
            // 计算旧数据区相对于 data Vec 的偏移
            let start = (lp.off as usize).saturating_sub(PageHeader::SIZE);
            let end = start + lp.len as usize;
            if end > self.data.len() {
                return Err(io::Error::new(ErrorKind::InvalidData, "line pointer exceeds the data area"));
            }
            // 新槽偏移 = header 后 + new_data 长度
            lp.off = (PageHeader::SIZE + new_data.len()) as u16;
            new_data.extend_from_slice(&self.data[start..end]);
        }
        self.data = new_data;

        // 更新页头
        let slot_dir_size = self.slots.len() * LinePointer::SIZE;
        self.header.slot_count = self.slots.len() as u16;
        self.header.free_offset = (PageHeader::SIZE + self.data.len()) as u16;
        self.header.free_bytes = (page_size - PageHeader::SIZE - self.data.len() - slot_dir_size) as u16;
        Ok(pruned)
    }
}
