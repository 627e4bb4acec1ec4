//! Segment store trait definition.

use crate::error::StoreResult;
use crate::id::SegmentId;

/// The backend persistence contract used by the segment engine.
///
/// Stores are **opaque blob maps**: they keep finished segments addressed
/// by [`SegmentId`] and hand out fresh ids. They never interpret segment
/// contents; the engine owns the binary layout.
///
/// # Invariants
///
/// - A segment written with [`SegmentStore::write_segment`] is immutable;
///   it is never written again under the same id
/// - `read_segment` returns exactly the bytes previously written for that
///   id, or a not-found error distinct from I/O failure
/// - Id factories never return an id already present in the store
///
/// # Implementors
///
/// - [`crate::MemoryStore`] - For testing and ephemeral repositories
pub trait SegmentStore: Send + Sync {
    /// Checks whether the identified segment exists in this store.
    fn contains_segment(&self, id: SegmentId) -> bool;

    /// Reads the identified segment from this store.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::SegmentNotFound`] if the segment is
    /// absent, or an I/O error if the read fails.
    fn read_segment(&self, id: SegmentId) -> StoreResult<Vec<u8>>;

    /// Writes a finished segment to this store.
    ///
    /// `data` is the exact byte range of the segment, header first.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. The engine does not retry;
    /// retry policy belongs to the caller.
    fn write_segment(&self, id: SegmentId, data: &[u8]) -> StoreResult<()>;

    /// Creates a [`SegmentId`] from the given msb/lsb pair.
    fn new_segment_id(&self, msb: u64, lsb: u64) -> SegmentId;

    /// Allocates a fresh id for a segment of type "data".
    fn new_data_segment_id(&self) -> SegmentId;

    /// Allocates a fresh id for a segment of type "bulk".
    fn new_bulk_segment_id(&self) -> SegmentId;
}
