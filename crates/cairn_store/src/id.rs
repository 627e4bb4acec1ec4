//! Segment identifiers.

use std::fmt;
use uuid::Uuid;

/// Mask clearing the type nibble of the least significant half.
const TYPE_MASK: u64 = 0x0fff_ffff_ffff_ffff;

/// The kind of segment an id names.
///
/// The type is encoded in the top nibble of the least significant half of
/// the id, so it can be recovered from the id alone without reading the
/// segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentType {
    /// A data segment: records with references, indexed roots, a header
    /// stamped with the GC generation.
    Data,
    /// A bulk segment: raw binary content, no internal structure.
    Bulk,
}

impl SegmentType {
    /// Returns the nibble stored in bits 60..64 of the lsb.
    #[must_use]
    pub const fn nibble(self) -> u64 {
        match self {
            Self::Data => 0xA,
            Self::Bulk => 0xB,
        }
    }
}

/// A 128-bit segment identifier.
///
/// Identifiers are immutable values compared by equality and used as map
/// and set keys throughout the engine. The most/least significant halves
/// are exposed separately because the wire format stores them as two
/// big-endian 64-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId {
    msb: u64,
    lsb: u64,
}

impl SegmentId {
    /// Creates a segment id from its two halves.
    #[must_use]
    pub const fn new(msb: u64, lsb: u64) -> Self {
        Self { msb, lsb }
    }

    /// Creates a random id of the given type.
    #[must_use]
    pub fn random(segment_type: SegmentType) -> Self {
        let msb: u64 = rand::random();
        let lsb: u64 = rand::random();
        Self {
            msb,
            lsb: (lsb & TYPE_MASK) | (segment_type.nibble() << 60),
        }
    }

    /// Returns the most significant 64 bits.
    #[must_use]
    pub const fn msb(self) -> u64 {
        self.msb
    }

    /// Returns the least significant 64 bits.
    #[must_use]
    pub const fn lsb(self) -> u64 {
        self.lsb
    }

    /// Checks whether this id names a data segment.
    #[must_use]
    pub const fn is_data(self) -> bool {
        is_data_segment_id(self.lsb)
    }

    /// Checks whether this id names a bulk segment.
    #[must_use]
    pub const fn is_bulk(self) -> bool {
        (self.lsb >> 60) == SegmentType::Bulk.nibble()
    }

    /// Returns the id in its canonical UUID form.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        Uuid::from_u64_pair(self.msb, self.lsb)
    }
}

/// Checks whether the given least significant half belongs to a data
/// segment id.
#[must_use]
pub const fn is_data_segment_id(lsb: u64) -> bool {
    (lsb >> 60) == 0xA
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_uuid())
    }
}

impl From<Uuid> for SegmentId {
    fn from(uuid: Uuid) -> Self {
        let (msb, lsb) = uuid.as_u64_pair();
        Self::new(msb, lsb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_id_type_nibble() {
        let id = SegmentId::random(SegmentType::Data);
        assert!(id.is_data());
        assert!(!id.is_bulk());
        assert!(is_data_segment_id(id.lsb()));
    }

    #[test]
    fn bulk_id_type_nibble() {
        let id = SegmentId::random(SegmentType::Bulk);
        assert!(id.is_bulk());
        assert!(!id.is_data());
    }

    #[test]
    fn halves_round_trip() {
        let id = SegmentId::new(0x0123_4567_89ab_cdef, 0xa000_0000_0000_0042);
        assert_eq!(id.msb(), 0x0123_4567_89ab_cdef);
        assert_eq!(id.lsb(), 0xa000_0000_0000_0042);
        assert_eq!(SegmentId::from(id.as_uuid()), id);
    }

    #[test]
    fn display_is_uuid() {
        let id = SegmentId::new(0, 0xa000_0000_0000_0000);
        assert_eq!(
            format!("{id}"),
            "00000000-0000-0000-a000-000000000000"
        );
    }
}
