use std::path::{Path, PathBuf};

use crate::cd::cd_types::{LiveSlotSet, Page, PageRange};
use crate::error::Result;
use crate::hm::{HeapSnapshot, HeapTable};
use crate::sm::sm_session::{PrimarySession, ReplicaSession};

// 从库会话：每次调用重新映射堆文件，读取当时的原始页内容
pub struct HeapReplica {
    path: PathBuf,
}

impl HeapReplica {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        // 先映射一次，确认文件存在且格式正确
        HeapSnapshot::open(path.as_ref())?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }
}

impl ReplicaSession for HeapReplica {
    fn relpages(&mut self, table: &str) -> Result<Vec<i64>> {
        let snapshot = HeapSnapshot::open(&self.path)?;
        if snapshot.header().relname == table {
            Ok(vec![snapshot.page_count() as i64])
        } else {
            Ok(Vec::new())
        }
    }

    fn scan_live_slots(
        &mut self,
        _table: &str,
        range: PageRange,
    ) -> Result<Vec<(Page, LiveSlotSet)>> {
        let snapshot = HeapSnapshot::open(&self.path)?;
        // 页数快照可能已过期（文件被截短），超出当前文件的页按空页处理
        let end = range.end.min(snapshot.page_count());
        let mut pages = Vec::new();
        for page in range.start..end {
            let live = snapshot.live_slots(page)?;
            if !live.is_empty() {
                pages.push((page, live));
            }
        }
        Ok(pages)
    }
}

// 主库会话：持有可写的堆表，提交即刷盘
pub struct HeapPrimary {
    table: HeapTable,
}

impl HeapPrimary {
    pub fn from_table(table: HeapTable) -> Self {
        Self { table }
    }

    #[cfg(test)]
    pub fn table(&mut self) -> &mut HeapTable {
        &mut self.table
    }

    #[cfg(test)]
    pub fn into_table(self) -> HeapTable {
        self.table
    }
}

impl PrimarySession for HeapPrimary {
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn relocate(
        &mut self,
        _table: &str,
        _field: &str,
        page: Page,
        slots: &LiveSlotSet,
    ) -> Result<u64> {
        let mut moved = 0;
        for slot in slots.iter() {
            if self.table.relocate((page, slot))?.is_some() {
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn live_slots(&mut self, _table: &str, page: Page) -> Result<LiveSlotSet> {
        Ok(self.table.live_slots(page)?)
    }

    fn commit(&mut self) -> Result<()> {
        Ok(self.table.flush()?)
    }
}
