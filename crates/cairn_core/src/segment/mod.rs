//! Segment binary layout and the segment buffer writer.
//!
//! A segment is an immutable, size-bounded binary blob: a fixed 32-byte
//! header, a table of referenced segment ids, a table of root records, and
//! the packed record payload, with the total length aligned to 16 bytes.

use crate::error::{CoreError, CoreResult};

mod binaries;
mod record;
mod record_id_set;
mod tracker;
mod writer;

pub use binaries::BinaryReferenceConsumer;
pub use record::{RecordId, RecordType};
pub use record_id_set::{RecordIdSet, ShortSet};
pub use tracker::SegmentTracker;
pub use writer::{SegmentBufferWriter, Statistics, WriterConfig};

/// Hard maximum size of a segment in bytes (256 KiB).
pub const MAX_SEGMENT_SIZE: usize = 1 << 18;

/// Size of the fixed segment header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Records are aligned to `1 << RECORD_ALIGN_BITS` byte boundaries, so a
/// 16-bit field can address any aligned offset within a maximum-size
/// segment.
pub const RECORD_ALIGN_BITS: usize = 2;

/// Size of a record id on the wire: segment msb + segment lsb + shifted
/// offset, all big-endian.
pub const RECORD_ID_BYTES: usize = 8 + 8 + 2;

/// Magic signature at the start of every segment.
pub const SEGMENT_MAGIC: [u8; 3] = *b"0aK";

/// Current segment format version.
pub const SEGMENT_VERSION: u8 = 13;

/// Header offset of the 16-bit root record count.
pub const ROOT_COUNT_OFFSET: usize = 6;

/// Header offset of the 32-bit referenced segment id count.
pub const REFERENCED_SEGMENT_ID_COUNT_OFFSET: usize = 8;

/// Header offset of the 32-bit GC generation.
pub const GC_GENERATION_OFFSET: usize = 12;

/// Rounds `value` up to the next multiple of `boundary`.
///
/// `boundary` must be a power of two.
#[must_use]
pub const fn align(value: usize, boundary: usize) -> usize {
    (value + boundary - 1) & !(boundary - 1)
}

/// The parsed fixed header of a finished segment.
///
/// Used by read paths and by the writer's GC-generation diagnostic; the
/// tables and payload are not interpreted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Segment format version.
    pub version: u8,
    /// Number of entries in the root record table.
    pub root_count: u16,
    /// Number of entries in the referenced segment id table.
    pub referenced_segment_id_count: u32,
    /// GC generation stamped when the segment was written.
    pub generation: u32,
}

impl SegmentHeader {
    /// Parses the fixed header from the start of a segment.
    ///
    /// # Errors
    ///
    /// Returns a corruption error if the data is shorter than the header
    /// or the magic signature does not match.
    pub fn parse(data: &[u8]) -> CoreResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(CoreError::segment_corruption("segment shorter than header"));
        }
        if data[0..3] != SEGMENT_MAGIC {
            return Err(CoreError::segment_corruption("invalid segment magic"));
        }

        let root_count = u16::from_be_bytes([data[ROOT_COUNT_OFFSET], data[ROOT_COUNT_OFFSET + 1]]);
        let referenced_segment_id_count = u32::from_be_bytes([
            data[REFERENCED_SEGMENT_ID_COUNT_OFFSET],
            data[REFERENCED_SEGMENT_ID_COUNT_OFFSET + 1],
            data[REFERENCED_SEGMENT_ID_COUNT_OFFSET + 2],
            data[REFERENCED_SEGMENT_ID_COUNT_OFFSET + 3],
        ]);
        let generation = u32::from_be_bytes([
            data[GC_GENERATION_OFFSET],
            data[GC_GENERATION_OFFSET + 1],
            data[GC_GENERATION_OFFSET + 2],
            data[GC_GENERATION_OFFSET + 3],
        ]);

        Ok(Self {
            version: data[3],
            root_count,
            referenced_segment_id_count,
            generation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_rounds_up_to_boundary() {
        assert_eq!(align(0, 16), 0);
        assert_eq!(align(1, 16), 16);
        assert_eq!(align(16, 16), 16);
        assert_eq!(align(17, 16), 32);
        assert_eq!(align(5, 4), 8);
    }

    #[test]
    fn header_rejects_short_data() {
        let result = SegmentHeader::parse(&[0u8; 4]);
        assert!(matches!(result, Err(CoreError::SegmentCorruption { .. })));
    }

    #[test]
    fn header_rejects_bad_magic() {
        let mut data = [0u8; HEADER_SIZE];
        data[0..3].copy_from_slice(b"xxx");
        let result = SegmentHeader::parse(&data);
        assert!(matches!(result, Err(CoreError::SegmentCorruption { .. })));
    }

    #[test]
    fn header_parses_fields() {
        let mut data = [0u8; HEADER_SIZE];
        data[0..3].copy_from_slice(&SEGMENT_MAGIC);
        data[3] = SEGMENT_VERSION;
        data[ROOT_COUNT_OFFSET..ROOT_COUNT_OFFSET + 2].copy_from_slice(&7u16.to_be_bytes());
        data[REFERENCED_SEGMENT_ID_COUNT_OFFSET..REFERENCED_SEGMENT_ID_COUNT_OFFSET + 4]
            .copy_from_slice(&3u32.to_be_bytes());
        data[GC_GENERATION_OFFSET..GC_GENERATION_OFFSET + 4]
            .copy_from_slice(&42u32.to_be_bytes());

        let header = SegmentHeader::parse(&data).unwrap();
        assert_eq!(header.version, SEGMENT_VERSION);
        assert_eq!(header.root_count, 7);
        assert_eq!(header.referenced_segment_id_count, 3);
        assert_eq!(header.generation, 42);
    }
}
