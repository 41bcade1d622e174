use crate::cd::cd_types::{LiveSlotSet, Page, PageRange};
use crate::error::Result;

/// 只读会话（从库）：只用于目录查询和批量候选扫描
pub trait ReplicaSession {
    /// 返回目录中所有同名表的已分配页数，每个匹配一行
    fn relpages(&mut self, table: &str) -> Result<Vec<i64>>;

    /// 列出区间内每个至少有一个存活槽的页及其存活槽集合，空页不返回
    fn scan_live_slots(&mut self, table: &str, range: PageRange)
        -> Result<Vec<(Page, LiveSlotSet)>>;
}

/// 读写会话（主库）：承载所有重定位写和校验读
pub trait PrimarySession {
    fn begin(&mut self) -> Result<()>;

    /// 对页内给定槽做一次“原值回写”，返回实际受影响的行数
    fn relocate(&mut self, table: &str, field: &str, page: Page, slots: &LiveSlotSet)
        -> Result<u64>;

    /// 在主库上重新读取单页的存活槽集合
    fn live_slots(&mut self, table: &str, page: Page) -> Result<LiveSlotSet>;

    fn commit(&mut self) -> Result<()>;
}
