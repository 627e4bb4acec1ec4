//! Compact membership sets for record identifiers.

use crate::segment::{RecordId, RECORD_ALIGN_BITS};
use cairn_store::SegmentId;
use std::collections::HashMap;

/// Maximum number of values per page before it is split.
const PAGE_SIZE: usize = 1024;

/// A compact set of 16-bit values.
///
/// Values are kept in a small number of sorted pages; membership tests
/// binary-search first across pages and then within the matching page, so
/// both insertion and lookup stay sub-linear without a full 65536-entry
/// bitmap. No deletion is supported and instances are not thread-safe,
/// matching their role inside the single-threaded buffer writer.
#[derive(Debug, Default)]
pub struct ShortSet {
    /// Non-empty sorted pages; every value in a page is smaller than
    /// every value in the next page.
    pages: Vec<Vec<u16>>,
}

impl ShortSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value to the set.
    ///
    /// Adding a value that is already present is a no-op.
    pub fn add(&mut self, value: u16) {
        if self.pages.is_empty() {
            self.pages.push(vec![value]);
            return;
        }

        let mut page_index = self.page_index(value);
        if page_index == self.pages.len() {
            page_index -= 1;
        }

        let page = &mut self.pages[page_index];
        match page.binary_search(&value) {
            Ok(_) => return,
            Err(pos) => page.insert(pos, value),
        }

        if page.len() > PAGE_SIZE {
            let upper = page.split_off(page.len() / 2);
            self.pages.insert(page_index + 1, upper);
        }
    }

    /// Checks whether a value is in the set.
    #[must_use]
    pub fn contains(&self, value: u16) -> bool {
        let page_index = self.page_index(value);
        if page_index == self.pages.len() {
            return false;
        }
        self.pages[page_index].binary_search(&value).is_ok()
    }

    /// Returns the number of values in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    /// Checks whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Index of the first page whose last value is >= `value`, or
    /// `pages.len()` if the value is greater than everything stored.
    fn page_index(&self, value: u16) -> usize {
        self.pages.partition_point(|page| page[page.len() - 1] < value)
    }
}

/// A set of record ids, organized per segment.
///
/// Offsets are aligned, so the shifted offset of a record fits 16 bits and
/// each segment's members can be tracked in a [`ShortSet`] instead of
/// hashing full record ids.
#[derive(Debug, Default)]
pub struct RecordIdSet {
    segments: HashMap<SegmentId, ShortSet>,
}

impl RecordIdSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id` to the set if not already present.
    ///
    /// Returns `true` if the id was added, `false` if it was already in
    /// the set.
    pub fn add_if_not_present(&mut self, id: &RecordId) -> bool {
        let key = (id.offset() >> RECORD_ALIGN_BITS) as u16;
        let offsets = self.segments.entry(id.segment_id()).or_default();
        if offsets.contains(key) {
            false
        } else {
            offsets.add(key);
            true
        }
    }

    /// Checks whether `id` is in the set.
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        let key = (id.offset() >> RECORD_ALIGN_BITS) as u16;
        self.segments
            .get(&id.segment_id())
            .is_some_and(|offsets| offsets.contains(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::RecordId;
    use cairn_store::SegmentType;
    use proptest::prelude::*;
    use rand::Rng;

    #[test]
    fn empty() {
        let set = ShortSet::new();
        assert!(set.is_empty());
        for k in 0..=u16::MAX {
            assert!(!set.contains(k));
        }
    }

    #[test]
    fn add_one() {
        let mut set = ShortSet::new();
        set.add(42);
        assert!(set.contains(42));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn add_two() {
        let mut set = ShortSet::new();
        set.add(21);
        set.add(42);
        assert!(set.contains(21));
        assert!(set.contains(42));
    }

    #[test]
    fn add_two_reverse() {
        let mut set = ShortSet::new();
        set.add(42);
        set.add(21);
        assert!(set.contains(21));
        assert!(set.contains(42));
    }

    #[test]
    fn add_first() {
        add_and_check(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 0]);
    }

    #[test]
    fn add_last() {
        add_and_check(&[8, 7, 6, 5, 4, 3, 2, 1, 0, 9]);
    }

    #[test]
    fn add_median() {
        add_and_check(&[0, 1, 2, 3, 4, 6, 7, 8, 9, 5]);
    }

    #[test]
    fn add_extremes() {
        add_and_check(&[0, u16::MAX, 1, u16::MAX - 1]);
    }

    #[test]
    fn add_duplicates() {
        let mut set = ShortSet::new();
        set.add(7);
        set.add(7);
        set.add(7);
        assert!(set.contains(7));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn add_random() {
        let mut rng = rand::thread_rng();
        let elements: Vec<u16> = (0..8192).map(|_| rng.gen()).collect();
        add_and_check(&elements);
    }

    #[test]
    fn pages_split_under_ascending_load() {
        let mut set = ShortSet::new();
        for k in 0..5000u16 {
            set.add(k);
        }
        assert_eq!(set.len(), 5000);
        for k in 0..5000u16 {
            assert!(set.contains(k));
        }
        assert!(!set.contains(5000));
    }

    fn add_and_check(elements: &[u16]) {
        let mut set = ShortSet::new();
        for &k in elements {
            set.add(k);
        }
        for &k in elements {
            assert!(set.contains(k), "expected {k} in set");
        }
    }

    proptest! {
        #[test]
        fn membership_is_exact(values in prop::collection::vec(any::<u16>(), 0..2000)) {
            let mut set = ShortSet::new();
            for &v in &values {
                set.add(v);
            }
            for &v in &values {
                prop_assert!(set.contains(v));
            }
            for candidate in 0..1000u16 {
                prop_assert_eq!(set.contains(candidate), values.contains(&candidate));
            }
        }
    }

    #[test]
    fn record_id_set_deduplicates() {
        let segment_id = cairn_store::SegmentId::random(SegmentType::Data);
        let mut set = RecordIdSet::new();
        let id = RecordId::new(segment_id, 64);

        assert!(!set.contains(&id));
        assert!(set.add_if_not_present(&id));
        assert!(!set.add_if_not_present(&id));
        assert!(set.contains(&id));
    }

    #[test]
    fn record_id_set_keeps_segments_apart() {
        let a = cairn_store::SegmentId::random(SegmentType::Data);
        let b = cairn_store::SegmentId::random(SegmentType::Data);
        let mut set = RecordIdSet::new();

        assert!(set.add_if_not_present(&RecordId::new(a, 64)));
        assert!(set.add_if_not_present(&RecordId::new(b, 64)));
        assert!(!set.add_if_not_present(&RecordId::new(a, 64)));
        assert!(!set.contains(&RecordId::new(a, 68)));
    }
}
