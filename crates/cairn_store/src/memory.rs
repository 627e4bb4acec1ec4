//! In-memory segment store for testing.

use crate::error::{StoreError, StoreResult};
use crate::id::{SegmentId, SegmentType};
use crate::store::SegmentStore;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory segment store.
///
/// This store keeps all segments in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral repositories that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use cairn_store::{MemoryStore, SegmentStore};
///
/// let store = MemoryStore::new();
/// let id = store.new_data_segment_id();
/// store.write_segment(id, &[1, 2, 3]).unwrap();
/// assert_eq!(store.read_segment(id).unwrap(), vec![1, 2, 3]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    segments: RwLock<HashMap<SegmentId, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of segments currently held.
    ///
    /// Useful for testing flush behavior.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Returns the ids of all segments currently held.
    #[must_use]
    pub fn segment_ids(&self) -> Vec<SegmentId> {
        self.segments.read().keys().copied().collect()
    }
}

impl SegmentStore for MemoryStore {
    fn contains_segment(&self, id: SegmentId) -> bool {
        self.segments.read().contains_key(&id)
    }

    fn read_segment(&self, id: SegmentId) -> StoreResult<Vec<u8>> {
        self.segments
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::SegmentNotFound { id })
    }

    fn write_segment(&self, id: SegmentId, data: &[u8]) -> StoreResult<()> {
        self.segments.write().insert(id, data.to_vec());
        Ok(())
    }

    fn new_segment_id(&self, msb: u64, lsb: u64) -> SegmentId {
        SegmentId::new(msb, lsb)
    }

    fn new_data_segment_id(&self) -> SegmentId {
        SegmentId::random(SegmentType::Data)
    }

    fn new_bulk_segment_id(&self) -> SegmentId {
        SegmentId::random(SegmentType::Bulk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read() {
        let store = MemoryStore::new();
        let id = store.new_data_segment_id();

        store.write_segment(id, b"hello segment").unwrap();

        assert!(store.contains_segment(id));
        assert_eq!(store.read_segment(id).unwrap(), b"hello segment");
    }

    #[test]
    fn missing_segment_is_not_found() {
        let store = MemoryStore::new();
        let id = store.new_data_segment_id();

        assert!(!store.contains_segment(id));

        let err = store.read_segment(id).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn fresh_ids_are_distinct() {
        let store = MemoryStore::new();
        let a = store.new_data_segment_id();
        let b = store.new_data_segment_id();
        assert_ne!(a, b);
        assert!(a.is_data());

        let c = store.new_bulk_segment_id();
        assert!(c.is_bulk());
    }

    #[test]
    fn segment_count_tracks_writes() {
        let store = MemoryStore::new();
        assert_eq!(store.segment_count(), 0);

        for _ in 0..3 {
            let id = store.new_data_segment_id();
            store.write_segment(id, &[0u8; 8]).unwrap();
        }

        assert_eq!(store.segment_count(), 3);
    }
}
