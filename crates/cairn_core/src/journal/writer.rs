//! Append side of the journal.

use crate::error::CoreResult;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Appends root-pointer entries to a journal file.
///
/// Every entry is one line, `"<root> <timestamp>"`, written newest-last
/// so that [`crate::journal::JournalReader`] yields it first. Writes go
/// through a single append-mode handle; [`JournalWriter::sync`] makes the
/// entries durable.
pub struct JournalWriter {
    file: File,
}

impl JournalWriter {
    /// Opens a journal file for appending, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    /// Appends an entry for `root` stamped with the current wall-clock
    /// time in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn append(&mut self, root: &str) -> CoreResult<()> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        self.append_with_timestamp(root, timestamp)
    }

    /// Appends an entry for `root` with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn append_with_timestamp(&mut self, root: &str, timestamp: i64) -> CoreResult<()> {
        writeln!(self.file, "{root} {timestamp}")?;
        Ok(())
    }

    /// Syncs all appended entries to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&mut self) -> CoreResult<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalReader;

    #[test]
    fn appended_entries_read_back_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");

        let mut writer = JournalWriter::open(&path).unwrap();
        writer.append_with_timestamp("first", 1).unwrap();
        writer.append_with_timestamp("second", 2).unwrap();
        writer.append_with_timestamp("third", 3).unwrap();
        writer.sync().unwrap();

        let reader = JournalReader::open(&path).unwrap();
        let roots: Vec<String> = reader.map(|e| e.unwrap().root().to_string()).collect();
        assert_eq!(roots, vec!["third", "second", "first"]);
    }

    #[test]
    fn append_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");

        {
            let mut writer = JournalWriter::open(&path).unwrap();
            writer.append_with_timestamp("old", 1).unwrap();
        }
        {
            let mut writer = JournalWriter::open(&path).unwrap();
            writer.append_with_timestamp("new", 2).unwrap();
        }

        let mut reader = JournalReader::open(&path).unwrap();
        assert_eq!(reader.next().unwrap().unwrap().root(), "new");
        assert_eq!(reader.next().unwrap().unwrap().root(), "old");
        assert!(reader.next().is_none());
    }

    #[test]
    fn wall_clock_append_is_a_valid_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");

        let mut writer = JournalWriter::open(&path).unwrap();
        writer.append("head").unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        let entry = reader.next().unwrap().unwrap();
        assert_eq!(entry.root(), "head");
        assert!(entry.timestamp().is_some());
    }
}
