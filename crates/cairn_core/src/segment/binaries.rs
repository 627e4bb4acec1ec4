//! External binary reference notification.

use cairn_store::SegmentId;

/// A consumer for references to external binaries.
///
/// An implementor is called every time a record encoding a reference to
/// an externally stored binary is written. The call is synchronous, in
/// the writer's own thread, once per reference: no batching, no async
/// dispatch. This lets an external component (such as binary-reference
/// garbage collection) index which binaries are reachable without
/// re-parsing segments later.
pub trait BinaryReferenceConsumer: Send + Sync {
    /// Consumes the reference to an external binary.
    ///
    /// # Arguments
    ///
    /// * `generation` - The GC generation of the record referencing the
    ///   binary.
    /// * `segment_id` - The id of the segment the reference belongs to.
    /// * `binary_reference` - The opaque string representation of the
    ///   binary reference.
    fn consume(&self, generation: u32, segment_id: SegmentId, binary_reference: &str);
}
