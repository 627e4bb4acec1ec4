//! Journal line parsing.

/// A parsed journal line: a root record pointer and its metadata.
///
/// A line is a valid entry if it contains a separating space; the root is
/// everything before the first space. The timestamp and the optional
/// trailing field are carried along when they parse but never make a line
/// invalid, so entries written by older tooling stay readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    root: String,
    timestamp: Option<i64>,
}

impl JournalEntry {
    /// Parses a journal line into an entry.
    ///
    /// Returns `None` for lines that are not valid entries, such as a
    /// line truncated by a crash mid-append; callers skip those and keep
    /// iterating.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let space = line.find(' ')?;
        let root = line[..space].to_string();
        let timestamp = line[space + 1..]
            .split_whitespace()
            .next()
            .and_then(|word| word.parse().ok());
        Some(Self { root, timestamp })
    }

    /// Returns the root record pointer of this entry.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Returns the entry's timestamp in milliseconds, if the line
    /// carried one.
    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_root_and_timestamp() {
        let entry = JournalEntry::parse("one 1").unwrap();
        assert_eq!(entry.root(), "one");
        assert_eq!(entry.timestamp(), Some(1));
    }

    #[test]
    fn extra_field_is_tolerated() {
        let entry = JournalEntry::parse("three 3 456").unwrap();
        assert_eq!(entry.root(), "three");
        assert_eq!(entry.timestamp(), Some(3));
    }

    #[test]
    fn line_without_separator_is_invalid() {
        assert_eq!(JournalEntry::parse("invalid"), None);
        assert_eq!(JournalEntry::parse(""), None);
    }

    #[test]
    fn whitespace_line_yields_empty_root() {
        let entry = JournalEntry::parse("   ").unwrap();
        assert_eq!(entry.root(), "");
        assert_eq!(entry.timestamp(), None);
    }

    #[test]
    fn unparsable_timestamp_is_dropped() {
        let entry = JournalEntry::parse("one then").unwrap();
        assert_eq!(entry.root(), "one");
        assert_eq!(entry.timestamp(), None);
    }
}
