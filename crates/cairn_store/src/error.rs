//! Error types for segment store operations.

use crate::id::SegmentId;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during segment store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested segment does not exist in this store.
    ///
    /// Kept distinct from [`StoreError::Io`] so that callers such as
    /// replication retry loops can wait for a segment that has not
    /// arrived yet instead of failing hard.
    #[error("segment not found: {id}")]
    SegmentNotFound {
        /// The id that was requested.
        id: SegmentId,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stored segment bytes are damaged.
    #[error("segment corrupted: {0}")]
    Corrupted(String),
}

impl StoreError {
    /// Creates a segment-not-found error.
    #[must_use]
    pub fn not_found(id: SegmentId) -> Self {
        Self::SegmentNotFound { id }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Returns `true` if this error is a segment-not-found condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SegmentNotFound { .. })
    }
}
