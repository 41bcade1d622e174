use serde::{Deserialize, Serialize};
use std::io::{self, ErrorKind};

/// 页面头元数据，存储槽目录计数、数据区偏移和剩余空闲字节数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageHeader {
    /// 槽目录项数（含未使用的槽）
    pub slot_count: u16,
    /// 下一个可写记录的起始偏移
    pub free_offset: u16,
    /// 页内剩余的空闲字节数
    pub free_bytes: u16,
}

impl PageHeader {
    /// 页头在帧中的字节长度（bincode 定长编码）
    pub const SIZE: usize = 6;

    // 空页的页头
    pub fn empty(page_size: usize) -> Self {
        PageHeader {
            slot_count: 0,
            free_offset: PageHeader::SIZE as u16,
            free_bytes: (page_size - PageHeader::SIZE) as u16,
        }
    }

    /// 从字节缓冲区解析出 PageHeader，要求 buf.len() >= SIZE
    pub fn from_bytes(buf: &[u8]) -> io::Result<PageHeader> {
        if buf.len() < PageHeader::SIZE {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "buffer too small for PageHeader"));
        }
        bincode::deserialize(&buf[..PageHeader::SIZE])
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))
    }

    /// 将 PageHeader 序列化到字节缓冲区，要求 buf.len() >= SIZE
    pub fn to_bytes(&self, buf: &mut [u8]) -> io::Result<()> {
        if buf.len() < PageHeader::SIZE {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "buffer too small for PageHeader"));
        }
        bincode::serialize_into(&mut buf[..PageHeader::SIZE], self)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))
    }
}
