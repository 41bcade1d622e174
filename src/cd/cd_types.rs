use std::collections::BTreeSet;
use std::fmt;

// 表文件内的页号，从 0 连续编号
pub type Page = u32;
// 页内的行指针序号（line pointer），与页号一起构成记录的物理地址
pub type Slot = u16;

/// 页内仍然存活的槽集合：已占用，且尚未被更新版本取代
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveSlotSet(BTreeSet<Slot>);

impl LiveSlotSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, slot: Slot) -> bool {
        self.0.contains(&slot)
    }

    #[cfg(test)]
    pub fn is_subset(&self, other: &LiveSlotSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Slot> + '_ {
        self.0.iter().copied()
    }

    // 以 `(page,slot)` 文本形式列出物理地址，PostgreSQL 的 tid 输入格式与之相同
    pub fn ctids(&self, page: Page) -> Vec<String> {
        self.iter().map(|slot| format!("({},{})", page, slot)).collect()
    }
}

impl FromIterator<Slot> for LiveSlotSet {
    fn from_iter<I: IntoIterator<Item = Slot>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 左闭右开的页号区间 `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRange {
    pub start: Page,
    pub end: Page,
}

impl PageRange {
    pub fn new(start: Page, end: Page) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, page: Page) -> bool {
        self.start <= page && page < self.end
    }

    // 闭区间上界，给 generate_series 之类的闭区间接口使用
    pub fn last(&self) -> Option<Page> {
        if self.is_empty() {
            None
        } else {
            Some(self.end - 1)
        }
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.start, self.end)
    }
}
