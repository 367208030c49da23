//! 去重计数 (Count Reconciler)
//!
//! One set of credited track IDs per target category. A category's count is
//! the size of its set, so counts only ever grow and crediting the same ID
//! twice is a no-op.

use std::collections::HashSet;

use log::debug;

pub struct CountReconciler {
    /// (类别, 已计数ID集合), 按配置顺序
    categories: Vec<(String, HashSet<u32>)>,
}

impl CountReconciler {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<(String, HashSet<u32>)> = Vec::new();
        for name in categories {
            let name = name.into();
            if !list.iter().any(|(n, _)| *n == name) {
                list.push((name, HashSet::new()));
            }
        }
        Self { categories: list }
    }

    /// Credit `track_id` to `category`. Returns `true` when the ID is new.
    ///
    /// A category outside the configured set changes nothing.
    pub fn update_count(&mut self, category: &str, track_id: u32) -> bool {
        match self.categories.iter_mut().find(|(n, _)| n == category) {
            Some((_, ids)) => ids.insert(track_id),
            None => {
                debug!("ignoring ID{} for non-target category {:?}", track_id, category);
                false
            }
        }
    }

    /// 0 for categories that are not configured.
    pub fn count(&self, category: &str) -> usize {
        self.categories
            .iter()
            .find(|(n, _)| n == category)
            .map_or(0, |(_, ids)| ids.len())
    }

    pub fn is_counted(&self, category: &str, track_id: u32) -> bool {
        self.categories
            .iter()
            .any(|(n, ids)| n == category && ids.contains(&track_id))
    }

    /// (category, count) in configuration order.
    pub fn counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.categories
            .iter()
            .map(|(n, ids)| (n.as_str(), ids.len()))
    }

    pub fn total(&self) -> usize {
        self.categories.iter().map(|(_, ids)| ids.len()).sum()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(n, _)| n.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler() -> CountReconciler {
        CountReconciler::new(["backpack", "handbag", "suitcase"])
    }

    #[test]
    fn counting_is_idempotent() {
        let mut r = reconciler();
        assert!(r.update_count("backpack", 5));
        assert!(!r.update_count("backpack", 5));
        assert!(!r.update_count("backpack", 5));
        assert_eq!(r.count("backpack"), 1);
    }

    #[test]
    fn categories_are_independent() {
        let mut r = reconciler();
        r.update_count("backpack", 3);
        assert!(r.update_count("handbag", 3));
        assert_eq!(r.count("backpack"), 1);
        assert_eq!(r.count("handbag"), 1);
        assert_eq!(r.count("suitcase"), 0);
        assert!(r.is_counted("handbag", 3));
        assert!(!r.is_counted("suitcase", 3));
    }

    #[test]
    fn counts_never_decrease() {
        let mut r = reconciler();
        let ids = [1, 2, 2, 7, 1, 9, 7, 7, 3];
        let mut last = 0;
        for id in ids {
            r.update_count("suitcase", id);
            let now = r.count("suitcase");
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 5);
        assert_eq!(r.total(), 5);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let mut r = reconciler();
        assert!(!r.update_count("umbrella", 1));
        assert_eq!(r.count("umbrella"), 0);
        assert_eq!(r.total(), 0);
    }

    #[test]
    fn counts_follow_configuration_order() {
        let mut r = CountReconciler::new(["suitcase", "backpack", "suitcase"]);
        r.update_count("backpack", 1);
        let counts: Vec<_> = r.counts().collect();
        assert_eq!(counts, vec![("suitcase", 0), ("backpack", 1)]);
    }
}
