//! # Cairn Core
//!
//! Segment buffer writer and journal for the Cairn storage engine.
//!
//! This crate provides:
//! - The segment binary layout and record identifier model
//! - The segment buffer writer: a backwards-growing allocator that packs
//!   records into fixed-size segments and flushes them to a
//!   [`cairn_store::SegmentStore`]
//! - Reference tracking for garbage collection: root records, referenced
//!   segment ids, and external binary references
//! - The root-pointer journal: an append-only text log read newest-first
//!   and tolerant of crash-truncated entries

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod journal;
pub mod segment;

pub use error::{CoreError, CoreResult};
pub use journal::{JournalEntry, JournalReader, JournalWriter};
pub use segment::{
    BinaryReferenceConsumer, RecordId, RecordIdSet, RecordType, SegmentBufferWriter,
    SegmentHeader, SegmentTracker, ShortSet, Statistics, WriterConfig,
};
