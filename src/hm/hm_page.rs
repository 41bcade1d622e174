use crate::cd::cd_types::{LiveSlotSet, Slot};
use crate::hm::hm_page_header::PageHeader;
use std::io::{self, ErrorKind};

/// 行指针：记录在页内的偏移、长度，以及取代它的事务号
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinePointer {
    pub off: u16,
    /// 0 表示未使用的槽
    pub len: u16,
    /// 非 0 表示该版本已被删除或被新版本取代
    pub xmax: u32,
}

impl LinePointer {
    /// 每个槽目录项占 8 字节
    pub const SIZE: usize = 8;

    pub fn is_used(&self) -> bool {
        self.len != 0
    }

    pub fn is_live(&self) -> bool {
        self.len != 0 && self.xmax == 0
    }
}

/// 行指针编号从 1 开始，槽目录下标从 0 开始
pub const FIRST_SLOT: Slot = 1;

pub fn slot_index(slot: Slot) -> Option<usize> {
    slot.checked_sub(FIRST_SLOT).map(|i| i as usize)
}

pub fn index_slot(idx: usize) -> Slot {
    idx as Slot + FIRST_SLOT
}

/// 内存页结构，包含页头、数据区和槽目录
pub struct Page {
    pub header: PageHeader,
    /// 记录数据区（不包含页头）
    pub data: Vec<u8>,
    /// 槽目录，位于页末
    pub slots: Vec<LinePointer>,
}

impl Page {
    // 新的空页
    pub fn empty(page_size: usize) -> Page {
        Page {
            header: PageHeader::empty(page_size),
            data: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// 从 frame 读取并解析成 Page
    pub fn load(frame: &[u8]) -> io::Result<Page> {
        // 解析页头
        let header = PageHeader::from_bytes(&frame[..PageHeader::SIZE.min(frame.len())])?;
        let page_size = frame.len();
        let slot_count = header.slot_count as usize;
        let slot_dir_size = slot_count * LinePointer::SIZE;
        if page_size < PageHeader::SIZE + slot_dir_size {
            return Err(io::Error::new(ErrorKind::InvalidData, "frame too small for slots"));
        }
        // 解析槽目录（位于页末）
        let mut slots = Vec::with_capacity(slot_count);
        let mut slot_base = page_size - slot_dir_size;
        for _ in 0..slot_count {
            let off = u16::from_le_bytes([frame[slot_base], frame[slot_base + 1]]);
            let len = u16::from_le_bytes([frame[slot_base + 2], frame[slot_base + 3]]);
            let xmax = u32::from_le_bytes([
                frame[slot_base + 4],
                frame[slot_base + 5],
                frame[slot_base + 6],
                frame[slot_base + 7],
            ]);
            slots.push(LinePointer { off, len, xmax });
            slot_base += LinePointer::SIZE;
        }
        // 解析数据区
        let data_end = header.free_offset as usize;
        if data_end < PageHeader::SIZE || data_end > page_size - slot_dir_size {
            return Err(io::Error::new(ErrorKind::InvalidData, "invalid free_offset"));
        }
        let data = frame[PageHeader::SIZE..data_end].to_vec();
        Ok(Page { header, data, slots })
    }

    /// 将 Page 序列化并写入 frame
    pub fn flush(&self, frame: &mut [u8]) -> io::Result<()> {
        let page_size = frame.len();
        let slot_count = self.slots.len();
        let slot_dir_size = slot_count * LinePointer::SIZE;
        // 检查 frame 空间
        if page_size < PageHeader::SIZE + self.data.len() + slot_dir_size {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "frame too small to flush page"));
        }
        // 更新并写入页头
        let mut hdr = self.header.clone();
        hdr.slot_count = slot_count as u16;
        hdr.free_offset = (PageHeader::SIZE + self.data.len()) as u16;
        hdr.free_bytes = (page_size - PageHeader::SIZE - self.data.len() - slot_dir_size) as u16;
        hdr.to_bytes(&mut frame[0..PageHeader::SIZE])?;
        // 写入数据区，空闲区清零
        let data_end = PageHeader::SIZE + self.data.len();
        frame[PageHeader::SIZE..data_end].copy_from_slice(&self.data);
        let slot_start = page_size - slot_dir_size;
        frame[data_end..slot_start].fill(0);
        // 写入槽目录
        let mut slot_base = slot_start;
        for lp in &self.slots {
            frame[slot_base..slot_base + 2].copy_from_slice(&lp.off.to_le_bytes());
            frame[slot_base + 2..slot_base + 4].copy_from_slice(&lp.len.to_le_bytes());
            frame[slot_base + 4..slot_base + 8].copy_from_slice(&lp.xmax.to_le_bytes());
            slot_base += LinePointer::SIZE;
        }
        Ok(())
    }

    // 存活槽集合：已占用且未被取代
    pub fn live_slots(&self) -> LiveSlotSet {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, lp)| lp.is_live())
            .map(|(idx, _)| index_slot(idx))
            .collect()
    }

    // 页内没有任何占用的槽（包括已被取代但尚未清理的版本）
    pub fn is_vacant(&self) -> bool {
        self.slots.iter().all(|lp| !lp.is_used())
    }

    #[cfg(test)]
    pub fn line_pointer(&self, slot: Slot) -> Option<&LinePointer> {
        slot_index(slot).and_then(|idx| self.slots.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hm::hm_page_compact::PageCompact;
    use crate::hm::hm_page_ops::PageOps;

    const PAGE_SIZE: usize = 256;

    fn round_trip(page: &Page) -> Page {
        let mut frame = vec![0u8; PAGE_SIZE];
        page.flush(&mut frame).unwrap();
        Page::load(&frame).unwrap()
    }

    #[test]
    fn insert_supersede_and_reload() {
        let mut page = Page::empty(PAGE_SIZE);
        let a = page.insert_record(b"alpha").unwrap();
        let b = page.insert_record(b"beta").unwrap();
        assert_eq!((a, b), (1, 2));
        page.supersede_record(a, 9).unwrap();

        let page = round_trip(&page);
        assert_eq!(page.live_slots(), [2].into_iter().collect::<LiveSlotSet>());
        assert_eq!(page.get_record(b).unwrap(), b"beta");
        assert_eq!(page.line_pointer(a).unwrap().xmax, 9);
        assert!(!page.is_vacant());
    }

    #[test]
    fn compaction_keeps_slot_numbers() {
        let mut page = Page::empty(PAGE_SIZE);
        for rec in [&b"one"[..], &b"two"[..], &b"three"[..]] {
            page.insert_record(rec).unwrap();
        }
        page.supersede_record(1, 4).unwrap();
        let pruned = page.prune(PAGE_SIZE).unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(page.get_record(2).unwrap(), b"two");
        assert_eq!(page.get_record(3).unwrap(), b"three");
        assert!(page.get_record(1).is_err());

        // 被清理的槽可以复用
        let again = page.insert_record(b"four").unwrap();
        assert_eq!(again, 1);
    }

    #[test]
    fn prune_drops_trailing_unused_slots() {
        let mut page = Page::empty(PAGE_SIZE);
        page.insert_record(b"x").unwrap();
        page.insert_record(b"y").unwrap();
        page.supersede_record(1, 1).unwrap();
        page.supersede_record(2, 1).unwrap();
        page.prune(PAGE_SIZE).unwrap();
        assert!(page.slots.is_empty());
        assert!(page.is_vacant());
        assert_eq!(page.header.free_bytes as usize, PAGE_SIZE - PageHeader::SIZE);
    }

    #[test]
    fn rejects_records_that_do_not_fit() {
        let mut page = Page::empty(PAGE_SIZE);
        let big = vec![7u8; PAGE_SIZE];
        assert!(page.insert_record(&big).is_err());
        assert!(!page.can_insert(PAGE_SIZE));
    }
}
