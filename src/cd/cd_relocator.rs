use crate::cd::cd_driver::DriverOptions;
use crate::cd::cd_report::{human_pages, PageOutcome};
use crate::cd::cd_types::{LiveSlotSet, Page};
use crate::error::Result;
use crate::logging::compact_log;
use crate::sm::PrimarySession;

// 重定位状态机的下一步
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// 对当前存活集合发起一次重定位写
    Relocate,
    /// 重定位有进展，需要在主库上重新读取存活集合
    Verify,
    Finished(PageOutcome),
}

/// 单页的重定位过程：尝试计数 + 当前存活集合
///
/// 两个出口互相独立：某次写一行未动即 `Stalled`，
/// 达到上限仍未清空即 `Exhausted`。
#[derive(Clone, Debug)]
pub struct RelocationAttempt {
    attempt: u32,
    max_attempts: u32,
    live: LiveSlotSet,
}

impl RelocationAttempt {
    pub fn new(live: LiveSlotSet, max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            live,
        }
    }

    /// 已发起的重定位写次数
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn live(&self) -> &LiveSlotSet {
        &self.live
    }

    pub fn start(&self) -> Step {
        if self.live.is_empty() {
            Step::Finished(PageOutcome::Emptied { attempts: 0 })
        } else {
            Step::Relocate
        }
    }

    // 记录一次重定位写的结果
    pub fn after_relocate(&mut self, moved: u64) -> Step {
        self.attempt += 1;
        if moved == 0 {
            return Step::Finished(PageOutcome::Stalled {
                attempts: self.attempt,
                remaining: self.live.len(),
            });
        }
        Step::Verify
    }

    // 记录校验读看到的存活集合
    pub fn after_verify(&mut self, live: LiveSlotSet) -> Step {
        self.live = live;
        if self.live.is_empty() {
            return Step::Finished(PageOutcome::Emptied {
                attempts: self.attempt,
            });
        }
        if self.attempt >= self.max_attempts {
            return Step::Finished(PageOutcome::Exhausted {
                attempts: self.attempt,
                remaining: self.live.len(),
            });
        }
        Step::Relocate
    }
}

// 单页处理的统计
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRun {
    pub outcome: PageOutcome,
    pub rows_moved: u64,
    pub relocations: u64,
    pub verifies: u64,
}

// 清空单页：重定位写与校验读交替进行，结束后（无论哪种出口）提交
pub fn relocate_page<P: PrimarySession>(
    primary: &mut P,
    opts: &DriverOptions,
    page: Page,
    live: LiveSlotSet,
) -> Result<PageRun> {
    let mut state = RelocationAttempt::new(live, opts.max_attempts);
    let mut rows_moved = 0u64;
    let mut relocations = 0u64;
    let mut verifies = 0u64;

    primary.begin()?;
    let mut step = state.start();
    let outcome = loop {
        step = match step {
            Step::Relocate => {
                let targets = state.live().clone();
                compact_log!(
                    log::Level::Info,
                    "relocate",
                    "at={} page={} rows={} ctids={:?}",
                    human_pages(page as u64, opts.page_size),
                    page,
                    targets.len(),
                    targets.ctids(page)
                );
                let moved = primary.relocate(&opts.table, &opts.field, page, &targets)?;
                relocations += 1;
                rows_moved += moved;
                compact_log!(
                    log::Level::Info,
                    "attempt",
                    "page={} attempt={} moved={}/{}",
                    page,
                    state.attempts(),
                    moved,
                    targets.len()
                );
                state.after_relocate(moved)
            }
            Step::Verify => {
                let live = primary.live_slots(&opts.table, page)?;
                verifies += 1;
                state.after_verify(live)
            }
            Step::Finished(outcome) => break outcome,
        };
    };
    primary.commit()?;

    match outcome {
        PageOutcome::Emptied { .. } => {}
        PageOutcome::Stalled { remaining, .. } => compact_log!(
            log::Level::Info,
            "page_stalled",
            "page={} remaining={}",
            page,
            remaining
        ),
        PageOutcome::Exhausted { attempts, remaining } => compact_log!(
            log::Level::Warn,
            "page_exhausted",
            "page={} attempts={} remaining={}",
            page,
            attempts,
            remaining
        ),
    }

    Ok(PageRun {
        outcome,
        rows_moved,
        relocations,
        verifies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(n: u16) -> LiveSlotSet {
        (1..=n).collect()
    }

    #[test]
    fn zero_progress_stops_immediately() {
        let mut state = RelocationAttempt::new(slots(3), 100);
        assert_eq!(state.start(), Step::Relocate);
        assert_eq!(
            state.after_relocate(0),
            Step::Finished(PageOutcome::Stalled {
                attempts: 1,
                remaining: 3
            })
        );
    }

    #[test]
    fn exhausts_at_bound() {
        let mut state = RelocationAttempt::new(slots(2), 3);
        for _ in 0..2 {
            assert_eq!(state.after_relocate(1), Step::Verify);
            assert_eq!(state.after_verify(slots(1)), Step::Relocate);
        }
        assert_eq!(state.after_relocate(1), Step::Verify);
        assert_eq!(
            state.after_verify(slots(1)),
            Step::Finished(PageOutcome::Exhausted {
                attempts: 3,
                remaining: 1
            })
        );
    }

    #[test]
    fn emptied_on_last_allowed_attempt() {
        let mut state = RelocationAttempt::new(slots(1), 1);
        assert_eq!(state.after_relocate(1), Step::Verify);
        assert_eq!(
            state.after_verify(LiveSlotSet::default()),
            Step::Finished(PageOutcome::Emptied { attempts: 1 })
        );
    }

    #[test]
    fn empty_page_needs_no_attempt() {
        let state = RelocationAttempt::new(LiveSlotSet::default(), 100);
        assert_eq!(
            state.start(),
            Step::Finished(PageOutcome::Emptied { attempts: 0 })
        );
    }
}
