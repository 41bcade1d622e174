use crate::cd::cd_probe::probe_page_count;
use crate::cd::cd_range::TailBatches;
use crate::cd::cd_relocator::relocate_page;
use crate::cd::cd_report::{human_pages, RunReport};
use crate::cd::cd_scanner::scan_batch;
use crate::config::{Backend, CompactConfig};
use crate::error::Result;
use crate::logging::compact_log;
use crate::sm::{PrimarySession, ReplicaSession};

// 驱动运行所需的参数
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverOptions {
    pub table: String,
    /// 原值回写使用的非键列
    pub field: String,
    pub batch_pages: u32,
    pub max_attempts: u32,
    pub page_size: usize,
}

impl DriverOptions {
    pub fn new(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            batch_pages: CompactConfig::DEFAULT_BATCH_PAGES,
            max_attempts: CompactConfig::DEFAULT_MAX_ATTEMPTS,
            page_size: CompactConfig::DEFAULT_PAGE_SIZE,
        }
    }
}

impl From<&CompactConfig> for DriverOptions {
    fn from(config: &CompactConfig) -> Self {
        let field = match &config.backend {
            Backend::Postgres { field, .. } => field.clone(),
            // 本地堆文件把记录当作不透明字节整体重写，不需要列名
            Backend::Heap { .. } => String::new(),
        };
        Self {
            table: config.table.clone(),
            field,
            batch_pages: config.batch_pages,
            max_attempts: config.max_attempts,
            page_size: config.page_size,
        }
    }
}

/// 尾部压缩驱动：从表尾向表头分批扫描，逐页清空存活记录
///
/// 会话由调用方打开并持有，驱动只借用，运行结束（包括出错）后由调用方释放。
pub struct CompactionDriver<'a, R, P> {
    replica: &'a mut R,
    primary: &'a mut P,
    opts: DriverOptions,
}

impl<'a, R, P> CompactionDriver<'a, R, P>
where
    R: ReplicaSession,
    P: PrimarySession,
{
    pub fn new(replica: &'a mut R, primary: &'a mut P, opts: DriverOptions) -> Self {
        Self {
            replica,
            primary,
            opts,
        }
    }

    // Initializing -> Scanning(batch) -> RelocatingPage(page) -> ... -> Done
    pub fn run(&mut self) -> Result<RunReport> {
        let page_count = probe_page_count(&mut *self.replica, &self.opts.table)?;
        compact_log!(
            log::Level::Info,
            "table_size",
            "table={} pages={} size={}",
            self.opts.table,
            page_count,
            human_pages(page_count as u64, self.opts.page_size)
        );

        let mut report = RunReport {
            page_count,
            ..RunReport::default()
        };
        for range in TailBatches::new(page_count, self.opts.batch_pages) {
            report.batches += 1;
            let candidates = scan_batch(&mut *self.replica, &self.opts.table, range)?;
            for (page, live) in candidates {
                let run = relocate_page(&mut *self.primary, &self.opts, page, live)?;
                report.record(&run.outcome);
                report.rows_relocated += run.rows_moved;
                report.relocations += run.relocations;
                report.verifies += run.verifies;
            }
        }

        compact_log!(log::Level::Info, "done", "{}", report);
        Ok(report)
    }
}
