use crate::cd::cd_types::Slot;
use crate::hm::hm_page::{index_slot, slot_index, LinePointer, Page};
use crate::hm::hm_page_header::PageHeader;
use std::io::{self, ErrorKind};

/// 在页面上操作记录的接口
pub trait PageOps {
    /// 是否能放下一条 len 字节的记录
    fn can_insert(&self, len: usize) -> bool;
    /// 插入一条记录，返回槽 ID（优先复用未使用的槽）
    fn insert_record(&mut self, data: &[u8]) -> io::Result<Slot>;
    /// 根据槽 ID 获取存活记录的数据切片
    fn get_record(&self, slot: Slot) -> io::Result<&[u8]>;
    /// 用事务号 xid 标记该版本已被取代（删除或更新）
    fn supersede_record(&mut self, slot: Slot, xid: u32) -> io::Result<()>;
}

impl Page {
    // 第一个可复用的未使用槽
    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|lp| !lp.is_used())
    }

    fn live_pointer(&self, slot: Slot) -> io::Result<LinePointer> {
        let lp = slot_index(slot)
            .and_then(|idx| self.slots.get(idx))
            .copied()
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "invalid slot id"))?;
        if !lp.is_live() {
            return Err(io::Error::new(ErrorKind::NotFound, "slot holds no live record"));
        }
        Ok(lp)
    }
}

impl PageOps for Page {
    fn can_insert(&self, len: usize) -> bool {
        let slot_cost = if self.free_slot().is_some() { 0 } else { LinePointer::SIZE };
        len > 0 && len <= u16::MAX as usize && len + slot_cost <= self.header.free_bytes as usize
    }

    fn insert_record(&mut self, data: &[u8]) -> io::Result<Slot> {
        if data.is_empty() {
            return Err(io::Error::new(ErrorKind::InvalidInput, "empty records are not stored"));
        }
        if !self.can_insert(data.len()) {
            return Err(io::Error::new(ErrorKind::Other, "page has no room for the record"));
        }
        let data_len = data.len() as u16;
        // 记录写入偏移，相对于页面起始
        let off = (PageHeader::SIZE + self.data.len()) as u16;
        self.data.extend_from_slice(data);
        let lp = LinePointer {
            off,
            len: data_len,
            xmax: 0,
        };
        let idx = match self.free_slot() {
            Some(idx) => {
                self.slots[idx] = lp;
                idx
            }
            None => {
                self.slots.push(lp);
                self.header.free_bytes -= LinePointer::SIZE as u16;
                self.slots.len() - 1
            }
        };
        // 更新页头元数据
        self.header.slot_count = self.slots.len() as u16;
        self.header.free_offset += data_len;
        self.header.free_bytes -= data_len;
        Ok(index_slot(idx))
    }

    fn get_record(&self, slot: Slot) -> io::Result<&[u8]> {
        let lp = self.live_pointer(slot)?;
        // data Vec 从页头之后开始，因此偏移应减去页头长度
        let start = (lp.off as usize).saturating_sub(PageHeader::SIZE);
        let end = start + lp.len as usize;
        if end > self.data.len() {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "record exceeds the data area"));
        }
        Ok(&self.data[start..end])
    }

    fn supersede_record(&mut self, slot: Slot, xid: u32) -> io::Result<()> {
        self.live_pointer(slot)?;
        if xid == 0 {
            return Err(io::Error::new(ErrorKind::InvalidInput, "xid 0 is reserved"));
        }
        if let Some(idx) = slot_index(slot) {
            self.slots[idx].xmax = xid;
        }
        Ok(())
    }
}
