//! Record identifiers and record kinds.

use crate::segment::{align, MAX_SEGMENT_SIZE, RECORD_ALIGN_BITS};
use cairn_store::SegmentId;
use std::fmt;

/// The kind of a record.
///
/// The kind is recorded only for root records, records not referenced by
/// any other record in the same segment, because roots are indexed in the
/// segment footer for reachability scanning. The ordinal of each kind is
/// the byte stored in the root table, so the enumeration is closed and the
/// discriminants are part of the binary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    /// A leaf of a map.
    Leaf = 0,
    /// A branch of a map.
    Branch = 1,
    /// A bucket of a list.
    Bucket = 2,
    /// A list record.
    List = 3,
    /// A value record (strings, small binaries, the segment metadata).
    Value = 4,
    /// A block of raw bytes.
    Block = 5,
    /// A node template record.
    Template = 6,
    /// A node state record.
    Node = 7,
    /// A reference to an externally stored binary.
    BlobId = 8,
}

impl RecordType {
    /// Returns the ordinal stored in the root table.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Decodes a record type from its root table ordinal.
    #[must_use]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Leaf),
            1 => Some(Self::Branch),
            2 => Some(Self::Bucket),
            3 => Some(Self::List),
            4 => Some(Self::Value),
            5 => Some(Self::Block),
            6 => Some(Self::Template),
            7 => Some(Self::Node),
            8 => Some(Self::BlobId),
            _ => None,
        }
    }
}

/// Identifies a record as a (segment id, intra-segment offset) pair.
///
/// The offset is always aligned to the record alignment boundary and
/// bounded by the maximum segment size. Identifiers are immutable and are
/// used as map keys by value equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    segment_id: SegmentId,
    offset: u32,
}

impl RecordId {
    /// Creates a record id.
    ///
    /// The offset must be aligned and below the maximum segment size;
    /// both are debug-checked because ids are only produced by the buffer
    /// writer, which maintains the invariant.
    #[must_use]
    pub fn new(segment_id: SegmentId, offset: u32) -> Self {
        debug_assert!((offset as usize) < MAX_SEGMENT_SIZE);
        debug_assert_eq!(
            offset as usize,
            align(offset as usize, 1 << RECORD_ALIGN_BITS)
        );
        Self { segment_id, offset }
    }

    /// Returns the id of the segment holding the record.
    #[must_use]
    pub const fn segment_id(self) -> SegmentId {
        self.segment_id
    }

    /// Returns the record's offset within its segment.
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.offset
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment_id, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_store::SegmentType;

    #[test]
    fn record_type_ordinals_round_trip() {
        for b in 0..=8u8 {
            let ty = RecordType::from_byte(b).unwrap();
            assert_eq!(ty.as_byte(), b);
        }
        assert_eq!(RecordType::from_byte(9), None);
    }

    #[test]
    fn record_id_equality() {
        let segment_id = SegmentId::random(SegmentType::Data);
        let a = RecordId::new(segment_id, 128);
        let b = RecordId::new(segment_id, 128);
        let c = RecordId::new(segment_id, 132);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.offset(), 128);
        assert_eq!(a.segment_id(), segment_id);
    }

    #[test]
    fn record_id_display() {
        let segment_id = SegmentId::new(0, 0xa000_0000_0000_0000);
        let id = RecordId::new(segment_id, 64);
        assert_eq!(
            format!("{id}"),
            "00000000-0000-0000-a000-000000000000:64"
        );
    }
}
