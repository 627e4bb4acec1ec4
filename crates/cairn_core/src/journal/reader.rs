//! Reverse journal reader.

use crate::error::CoreResult;
use crate::journal::entry::JournalEntry;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Chunk size for backwards file reads.
///
/// Journal lines are short; one chunk usually covers many entries while
/// keeping memory bounded for large journals.
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// A lazy, reverse-order reader over a journal file.
///
/// Produces one [`JournalEntry`] per valid line, newest entry first, by
/// reading the file from its end backwards in chunks. Lines that do not
/// parse (typically the last line, truncated by a crash mid-append) are
/// skipped silently and iteration continues to older entries.
///
/// The reader owns its file handle; it is released when the reader is
/// dropped, on every exit path including early termination.
///
/// # Example
///
/// ```no_run
/// use cairn_core::journal::JournalReader;
/// use std::path::Path;
///
/// let mut reader = JournalReader::open(Path::new("journal.log")).unwrap();
/// if let Some(entry) = reader.next() {
///     println!("latest root: {}", entry.unwrap().root());
/// }
/// ```
pub struct JournalReader {
    file: File,
    /// Bytes of the file not yet pulled into `chunk`.
    remaining: u64,
    /// Unscanned bytes, in file order; always the region immediately
    /// after `remaining`.
    chunk: Vec<u8>,
    /// Whether the tail of the file has been read yet.
    tail_read: bool,
    /// Set after an I/O error or exhaustion; no further items.
    finished: bool,
}

impl JournalReader {
    /// Opens a journal file for newest-first iteration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its size cannot
    /// be determined.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let file = File::open(path)?;
        let remaining = file.metadata()?.len();
        Ok(Self {
            file,
            remaining,
            chunk: Vec::new(),
            tail_read: false,
            finished: false,
        })
    }

    /// Reads the next line scanning backwards, or `None` when the whole
    /// file has been consumed.
    fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(idx) = self.chunk.iter().rposition(|&b| b == b'\n') {
                let line = self.chunk.split_off(idx + 1);
                self.chunk.pop();
                return Ok(Some(to_line(line)));
            }

            if self.remaining == 0 {
                if self.chunk.is_empty() {
                    return Ok(None);
                }
                let line = std::mem::take(&mut self.chunk);
                return Ok(Some(to_line(line)));
            }

            // Pull the chunk preceding the bytes we already hold.
            let step = READ_CHUNK_SIZE.min(self.remaining as usize);
            self.remaining -= step as u64;
            let mut buf = vec![0u8; step];
            self.file.seek(SeekFrom::Start(self.remaining))?;
            self.file.read_exact(&mut buf)?;

            if !self.tail_read {
                self.tail_read = true;
                // A trailing newline terminates the last entry; it does
                // not start an empty one.
                if self.chunk.is_empty() && buf.last() == Some(&b'\n') {
                    buf.pop();
                }
            }

            buf.extend_from_slice(&self.chunk);
            self.chunk = buf;
        }
    }
}

fn to_line(mut bytes: Vec<u8>) -> String {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

impl Iterator for JournalReader {
    type Item = CoreResult<JournalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.next_line() {
                Ok(Some(line)) => {
                    // Malformed lines are skipped, not surfaced.
                    if let Some(entry) = JournalEntry::parse(&line) {
                        return Some(Ok(entry));
                    }
                }
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn journal_with(content: &str) -> (TempDir, JournalReader) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let reader = JournalReader::open(&path).unwrap();
        (dir, reader)
    }

    fn roots(reader: JournalReader) -> Vec<String> {
        reader.map(|e| e.unwrap().root().to_string()).collect()
    }

    #[test]
    fn empty_file_has_no_entries() {
        let (_dir, mut reader) = journal_with("");
        assert!(reader.next().is_none());
    }

    #[test]
    fn singleton() {
        let (_dir, reader) = journal_with("one 1");
        assert_eq!(roots(reader), vec!["one"]);
    }

    #[test]
    fn multiple_entries_newest_first() {
        let (_dir, reader) = journal_with("one 1\ntwo 2\nthree 3 456");
        assert_eq!(roots(reader), vec!["three", "two", "one"]);
    }

    #[test]
    fn trailing_newline_does_not_add_an_entry() {
        let (_dir, reader) = journal_with("one 1\ntwo 2\n");
        assert_eq!(roots(reader), vec!["two", "one"]);
    }

    #[test]
    fn whitespace_lines_yield_empty_roots() {
        let (_dir, reader) = journal_with("\n \n  \n   ");
        assert_eq!(roots(reader), vec!["", "", ""]);
    }

    #[test]
    fn invalid_lines_are_skipped() {
        let (_dir, reader) = journal_with("one 1\ntwo 2\ninvalid\nthree 3");
        assert_eq!(roots(reader), vec!["three", "two", "one"]);
    }

    #[test]
    fn truncated_final_line_is_skipped() {
        // A crash mid-append leaves a partial line at the end.
        let (_dir, reader) = journal_with("one 1\ntwo 2\nthr");
        assert_eq!(roots(reader), vec!["two", "one"]);
    }

    #[test]
    fn early_termination_is_allowed() {
        let (_dir, mut reader) = journal_with("one 1\ntwo 2\nthree 3");
        assert_eq!(reader.next().unwrap().unwrap().root(), "three");
        // Dropping the reader here releases the file handle.
    }

    #[test]
    fn timestamps_are_preserved() {
        let (_dir, mut reader) = journal_with("one 17");
        let entry = reader.next().unwrap().unwrap();
        assert_eq!(entry.root(), "one");
        assert_eq!(entry.timestamp(), Some(17));
    }

    #[test]
    fn crlf_lines_are_handled() {
        let (_dir, reader) = journal_with("one 1\r\ntwo 2\r\n");
        assert_eq!(roots(reader), vec!["two", "one"]);
    }

    #[test]
    fn large_journal_crosses_chunk_boundaries() {
        let mut content = String::new();
        for k in 0..5000 {
            content.push_str(&format!("root-{k} {k}\n"));
        }
        let (_dir, reader) = journal_with(&content);

        let all = roots(reader);
        assert_eq!(all.len(), 5000);
        assert_eq!(all[0], "root-4999");
        assert_eq!(all[4999], "root-0");
    }
}
