use serde::{Deserialize, Serialize};
use std::io::{self, ErrorKind, Read};

// 持久化的文件头，存放在文件的第一个块（块号 0），用 bincode 编码
// 字段：
// - magic: 文件标识
// - relname: 表名，目录查询按它匹配
// - block_size: 块大小（字节），即一页的大小
// - block_count: 已分配的块数量（含文件头块）
// - next_xid: 下一个事务号，写入 xmax 用，从 1 开始（0 表示未被取代）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub magic: u32,
    pub relname: String,
    pub block_size: u32,
    pub block_count: u32,
    pub next_xid: u32,
}

impl FileHeader {
    pub const MAGIC: u32 = 0x4845_4150; // "HEAP"

    // 创建一个默认文件头：block_count 从 1 开始（0 用于文件头）
    pub fn new(relname: impl Into<String>, block_size: usize) -> Self {
        Self {
            magic: Self::MAGIC,
            relname: relname.into(),
            block_size: block_size as u32,
            block_count: 1,
            next_xid: 1,
        }
    }

    // 数据页数量（不含文件头块）
    pub fn page_count(&self) -> u32 {
        self.block_count.saturating_sub(1)
    }

    // 序列化为字节，长度不得超过一个块
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let bytes = bincode::serialize(self).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
        if bytes.len() > self.block_size as usize {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("file header of {} bytes does not fit a block", bytes.len()),
            ));
        }
        Ok(bytes)
    }

    // 从块 0 的字节反序列化，并校验 magic
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let header: FileHeader =
            bincode::deserialize(bytes).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
        header.validate()
    }

    pub fn read_from<R: Read>(reader: R) -> io::Result<Self> {
        let header: FileHeader = bincode::deserialize_from(reader)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
        header.validate()
    }

    fn validate(self) -> io::Result<Self> {
        if self.magic != Self::MAGIC {
            return Err(io::Error::new(ErrorKind::InvalidData, "not a heap table file"));
        }
        if self.block_count == 0 {
            return Err(io::Error::new(ErrorKind::InvalidData, "file header reports zero blocks"));
        }
        Ok(self)
    }
}
