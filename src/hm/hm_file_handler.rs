use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::hm_file_header::FileHeader;
use crate::logging::compact_log;

type BlockId = u32;

// 文件头块编号常量（块 0）
const HEADER_BLOCK_NUMBER: u32 = 0;

// 块大小的上下限：页内偏移用 u16 表示
const MIN_BLOCK_SIZE: usize = 128;
const MAX_BLOCK_SIZE: usize = u16::MAX as usize;

// FileHandle: 对单个堆表文件的抽象，封装了对块的读写、扩展和尾部截断
pub struct FileHandle {
    file: File,
    path: PathBuf,
    block_size: usize,
    header: FileHeader,
    header_dirty: bool,
}

impl FileHandle {
    // 创建新的表文件：创建上级目录并写入初始文件头块
    pub fn create<P: AsRef<Path>>(path: P, relname: &str, block_size: usize) -> io::Result<Self> {
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("block size {} outside {}..={}", block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE),
            ));
        }
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        let mut handle = Self {
            file,
            path: path.to_path_buf(),
            block_size,
            header: FileHeader::new(relname, block_size),
            header_dirty: false,
        };
        handle.file.set_len(block_size as u64)?;
        handle.write_header()?;
        handle.file.sync_data()?;
        Ok(handle)
    }

    // 打开已有文件并读取文件头
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        file.seek(SeekFrom::Start(0))?;
        let header = FileHeader::read_from(&mut file)?;
        let block_size = header.block_size as usize;
        let expected_len = header.block_count as u64 * block_size as u64;
        if file.metadata()?.len() < expected_len {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!(
                    "file {} is shorter than its {} blocks",
                    path.display(),
                    header.block_count
                ),
            ));
        }
        Ok(Self {
            file,
            path: path.to_path_buf(),
            block_size,
            header,
            header_dirty: false,
        })
    }

    // 返回块大小（字节）
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    // 读取内存中的文件头副本
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    // 数据块数量（不含文件头块）
    pub fn data_blocks(&self) -> u32 {
        self.header.page_count()
    }

    // 取一个新的事务号
    pub fn next_xid(&mut self) -> u32 {
        let xid = self.header.next_xid;
        self.header.next_xid = self.header.next_xid.wrapping_add(1).max(1);
        self.header_dirty = true;
        xid
    }

    // 从指定块读取整个块数据到 buffer
    pub fn read_block(&mut self, block: BlockId, buffer: &mut [u8]) -> io::Result<()> {
        self.check_buffer(buffer.len())?;
        self.ensure_valid_block(block)?;
        self.seek_to_block(block)?;
        self.file.read_exact(buffer)
    }

    // 将 buffer 的整块数据写回指定块
    pub fn write_block(&mut self, block: BlockId, buffer: &[u8]) -> io::Result<()> {
        self.check_buffer(buffer.len())?;
        self.ensure_valid_block(block)?;
        self.seek_to_block(block)?;
        self.file.write_all(buffer)
    }

    // 在文件末尾扩展一个清零的新块
    pub fn allocate_block(&mut self) -> io::Result<BlockId> {
        let block_num = self.header.block_count;
        let required_len = (block_num as u64 + 1) * self.block_size as u64;
        self.file.set_len(required_len)?;
        self.header.block_count += 1;
        self.header_dirty = true;
        Ok(block_num)
    }

    // 截断文件，只保留前 block_count 个块（含文件头块）
    pub fn truncate_blocks(&mut self, block_count: u32) -> io::Result<()> {
        if block_count == 0 || block_count > self.header.block_count {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "cannot truncate to {} blocks (current {})",
                    block_count, self.header.block_count
                ),
            ));
        }
        self.header.block_count = block_count;
        self.header_dirty = true;
        self.write_header()?;
        self.header_dirty = false;
        self.file.set_len(block_count as u64 * self.block_size as u64)?;
        self.file.sync_all()
    }

    // 将内存中脏的文件头写回并同步到磁盘
    pub fn flush(&mut self) -> io::Result<()> {
        if self.header_dirty {
            self.write_header()?;
            self.header_dirty = false;
        }
        self.file.flush()?;
        self.file.sync_data()
    }

    fn check_buffer(&self, len: usize) -> io::Result<()> {
        // 校验 buffer 长度是否和块大小一致
        if len != self.block_size {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("buffer length {} does not match block size {}", len, self.block_size),
            ));
        }
        Ok(())
    }

    // 验证块号是否在合理范围内（并排除文件头块）
    fn ensure_valid_block(&self, block_number: u32) -> io::Result<()> {
        if block_number == HEADER_BLOCK_NUMBER {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "the header block is not a data block",
            ));
        }
        if block_number >= self.header.block_count {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "block {} out of range (block count {})",
                    block_number, self.header.block_count
                ),
            ));
        }
        Ok(())
    }

    // 将内存中的文件头写回块 0
    fn write_header(&mut self) -> io::Result<()> {
        let bytes = self.header.to_bytes()?;
        self.seek_to_block(HEADER_BLOCK_NUMBER)?;
        self.file.write_all(&bytes)
    }

    // 定位到指定块偏移
    fn seek_to_block(&mut self, block_number: u32) -> io::Result<()> {
        let offset = block_number as u64 * self.block_size as u64;
        self.file.seek(SeekFrom::Start(offset)).map(|_| ())
    }
}

// 当 FileHandle 被 Drop 时，如果文件头脏则尝试持久化
impl Drop for FileHandle {
    fn drop(&mut self) {
        if self.header_dirty {
            if let Err(err) = self.write_header() {
                compact_log!(
                    log::Level::Warn,
                    "header_persist_failed",
                    "path={} error={}",
                    self.path.display(),
                    err
                );
            }
        }
        let _ = self.file.flush();
    }
}
