use crate::cd::cd_types::{Page, PageRange};

/// 从表尾向表头倒序切分的批次迭代器
///
/// 游标从页数（最后一页的下一个位置）开始，每次产出 `[cursor - batch, cursor)`，
/// 低端显式截断到 0，因此最后一个批次可能不足 `batch` 页。
/// 游标严格递减，共产出 ⌈page_count / batch⌉ 个批次。
#[derive(Clone, Debug)]
pub struct TailBatches {
    cursor: Page,
    batch: u32,
}

impl TailBatches {
    pub fn new(page_count: Page, batch: u32) -> Self {
        // batch 为 0 时无法前进，按 1 处理
        Self {
            cursor: page_count,
            batch: batch.max(1),
        }
    }

    pub fn cursor(&self) -> Page {
        self.cursor
    }
}

impl Iterator for TailBatches {
    type Item = PageRange;

    fn next(&mut self) -> Option<PageRange> {
        if self.cursor == 0 {
            return None;
        }
        let end = self.cursor;
        let start = end.saturating_sub(self.batch);
        self.cursor = start;
        Some(PageRange::new(start, end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.cursor.div_ceil(self.batch) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for TailBatches {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_tail_to_head_and_clamps_at_zero() {
        let batches: Vec<_> = TailBatches::new(25_000, 10_000).collect();
        assert_eq!(
            batches,
            vec![
                PageRange::new(15_000, 25_000),
                PageRange::new(5_000, 15_000),
                PageRange::new(0, 5_000),
            ]
        );
    }

    #[test]
    fn batch_count_is_ceiling() {
        for (pages, batch) in [(1, 10), (10, 10), (11, 10), (25_000, 10_000), (99_999, 7)] {
            let it = TailBatches::new(pages, batch);
            let expected = pages.div_ceil(batch) as usize;
            assert_eq!(it.len(), expected);
            assert_eq!(it.count(), expected);
        }
    }

    #[test]
    fn covers_every_page_exactly_once() {
        let mut seen = vec![0u8; 1234];
        for range in TailBatches::new(1234, 100) {
            for page in range.start..range.end {
                seen[page as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn cursor_strictly_decreases() {
        let mut it = TailBatches::new(50, 20);
        let mut last = it.cursor();
        while it.next().is_some() {
            assert!(it.cursor() < last);
            last = it.cursor();
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn empty_table_has_no_batches() {
        assert_eq!(TailBatches::new(0, 10_000).next(), None);
    }
}
