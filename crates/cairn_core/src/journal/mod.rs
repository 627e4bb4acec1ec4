//! The repository-root journal.
//!
//! The journal is a plain-text append-only log of historical root-record
//! pointers, one entry per line in the form `"<recordId> <timestamp>
//! [<extra>]"`, newest entries appended last. [`JournalWriter`] appends
//! entries; [`JournalReader`] consumes them newest-first, skipping lines a
//! crash left malformed.

mod entry;
mod reader;
mod writer;

pub use entry::JournalEntry;
pub use reader::JournalReader;
pub use writer::JournalWriter;
