use crate::cd::cd_types::{LiveSlotSet, Page, PageRange};
use crate::error::Result;
use crate::logging::compact_log;
use crate::sm::ReplicaSession;

// 在从库上扫描一个批次，返回含存活记录的候选页（按扫描返回的顺序）
pub fn scan_batch<R: ReplicaSession>(
    replica: &mut R,
    table: &str,
    range: PageRange,
) -> Result<Vec<(Page, LiveSlotSet)>> {
    if range.is_empty() {
        return Ok(Vec::new());
    }
    let mut pages = replica.scan_live_slots(table, range)?;
    // 会话实现应已过滤，这里再保证一次：区间外的页和空集合都不交给驱动
    pages.retain(|(page, slots)| range.contains(*page) && !slots.is_empty());
    compact_log!(
        log::Level::Debug,
        "batch_scanned",
        "range={} candidates={}",
        range,
        pages.len()
    );
    Ok(pages)
}
