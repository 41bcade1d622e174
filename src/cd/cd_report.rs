use std::fmt;

use crate::cd::cd_types::Page;

// 把页号（或页数）换算成 GB 文本，固定 6 位小数
pub fn human_pages(pages: u64, page_size: usize) -> String {
    let gb = pages as f64 * page_size as f64 / 1024.0 / 1024.0 / 1024.0;
    format!("{:.6}gb", gb)
}

// 单页处理结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    /// 校验读确认页面已无存活记录
    Emptied { attempts: u32 },
    /// 某次重定位一行也没有移动，放弃本页留给下次运行
    Stalled { attempts: u32, remaining: usize },
    /// 达到尝试上限仍有存活记录
    Exhausted { attempts: u32, remaining: usize },
}

impl PageOutcome {
    pub fn attempts(&self) -> u32 {
        match *self {
            PageOutcome::Emptied { attempts }
            | PageOutcome::Stalled { attempts, .. }
            | PageOutcome::Exhausted { attempts, .. } => attempts,
        }
    }
}

// 一次运行的汇总
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub page_count: Page,
    pub batches: u32,
    pub pages_visited: u32,
    pub pages_emptied: u32,
    pub pages_stalled: u32,
    pub pages_exhausted: u32,
    pub rows_relocated: u64,
    pub relocations: u64,
    pub verifies: u64,
}

impl RunReport {
    pub fn record(&mut self, outcome: &PageOutcome) {
        self.pages_visited += 1;
        match outcome {
            PageOutcome::Emptied { .. } => self.pages_emptied += 1,
            PageOutcome::Stalled { .. } => self.pages_stalled += 1,
            PageOutcome::Exhausted { .. } => self.pages_exhausted += 1,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pages={} batches={} visited={} emptied={} stalled={} exhausted={} rows_relocated={} relocations={} verifies={}",
            self.page_count,
            self.batches,
            self.pages_visited,
            self.pages_emptied,
            self.pages_stalled,
            self.pages_exhausted,
            self.rows_relocated,
            self.relocations,
            self.verifies,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_sizes() {
        assert_eq!(human_pages(0, 8192), "0.000000gb");
        // 131072 个 8KB 页正好 1GB
        assert_eq!(human_pages(131_072, 8192), "1.000000gb");
        assert_eq!(human_pages(24_999, 8192), "0.190727gb");
    }

    #[test]
    fn report_counts_outcomes() {
        let mut report = RunReport::default();
        report.record(&PageOutcome::Emptied { attempts: 1 });
        report.record(&PageOutcome::Stalled {
            attempts: 1,
            remaining: 3,
        });
        report.record(&PageOutcome::Exhausted {
            attempts: 100,
            remaining: 1,
        });
        assert_eq!(report.pages_visited, 3);
        assert_eq!(report.pages_emptied, 1);
        assert_eq!(report.pages_stalled, 1);
        assert_eq!(report.pages_exhausted, 1);
    }
}
