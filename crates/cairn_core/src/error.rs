//! Error types for Cairn core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Cairn core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Segment store error.
    #[error("store error: {0}")]
    Store(#[from] cairn_store::StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record or segment footer cannot fit the maximum segment size.
    ///
    /// This is a caller or configuration error, never retried.
    #[error("too much data for a segment: {size} bytes exceeds capacity {capacity}")]
    SegmentOverflow {
        /// The total segment size that was required.
        size: usize,
        /// The fixed segment capacity.
        capacity: usize,
    },

    /// Segment bytes are corrupted or have an invalid header.
    #[error("segment corruption: {message}")]
    SegmentCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a segment corruption error.
    pub fn segment_corruption(message: impl Into<String>) -> Self {
        Self::SegmentCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
