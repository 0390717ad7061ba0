use std::collections::BTreeSet;

use super::section::ExpandKey;

/// The set of folds the user has opened.
///
/// Values are immutable: every toggle returns a new set, so the owning view
/// swaps its copy and the next render sees the change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedSet {
    keys: BTreeSet<ExpandKey>,
}

impl ExpandedSet {
    pub fn contains(&self, key: &ExpandKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// New set with `key` flipped in or out
    pub fn toggled(&self, key: ExpandKey) -> Self {
        let mut keys = self.keys.clone();
        if !keys.remove(&key) {
            keys.insert(key);
        }
        Self { keys }
    }

    /// New set with every key in `keys` present
    pub fn with_all(&self, keys: impl IntoIterator<Item = ExpandKey>) -> Self {
        let mut next = self.keys.clone();
        next.extend(keys);
        Self { keys: next }
    }

    /// New set without any key belonging to `file_index`
    pub fn without_file(&self, file_index: usize) -> Self {
        Self {
            keys: self
                .keys
                .iter()
                .filter(|k| k.file_index != file_index)
                .copied()
                .collect(),
        }
    }

    /// Number of open folds in one file
    pub fn count_in_file(&self, file_index: usize) -> usize {
        self.keys.iter().filter(|k| k.file_index == file_index).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(file: usize, start: usize, end: usize) -> ExpandKey {
        ExpandKey::new(file, start..end)
    }

    #[test]
    fn toggle_adds_then_removes() {
        let empty = ExpandedSet::default();
        let one = empty.toggled(key(0, 4, 9));
        assert!(one.contains(&key(0, 4, 9)));
        assert!(empty.is_empty(), "original set must be left untouched");

        let back = one.toggled(key(0, 4, 9));
        assert_eq!(back, empty);
    }

    #[test]
    fn keys_compare_by_value() {
        let set = ExpandedSet::default().toggled(key(2, 10, 20));
        assert!(set.contains(&key(2, 10, 20)));
        assert!(!set.contains(&key(2, 10, 21)));
        assert!(!set.contains(&key(3, 10, 20)));
    }

    #[test]
    fn bulk_expand_and_collapse_per_file() {
        let set = ExpandedSet::default()
            .with_all([key(0, 1, 5), key(0, 9, 15)])
            .toggled(key(1, 3, 8));
        assert_eq!(set.len(), 3);
        assert_eq!(set.count_in_file(0), 2);

        let collapsed = set.without_file(0);
        assert_eq!(collapsed.len(), 1);
        assert!(collapsed.contains(&key(1, 3, 8)));
        assert_eq!(collapsed.count_in_file(0), 0);
    }

    #[test]
    fn with_all_is_idempotent() {
        let once = ExpandedSet::default().with_all([key(0, 1, 5)]);
        let twice = once.with_all([key(0, 1, 5)]);
        assert_eq!(once, twice);
    }
}
