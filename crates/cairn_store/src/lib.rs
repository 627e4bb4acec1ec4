//! # Cairn Store
//!
//! Segment store contract and reference implementations for Cairn.
//!
//! This crate provides the lowest-level persistence abstraction of the
//! segment storage engine. A [`SegmentStore`] keeps finished segments
//! (immutable, size-bounded binary blobs) addressed by 128-bit
//! [`SegmentId`]s. Stores do not interpret segment contents; the engine
//! crate owns the binary layout.
//!
//! ## Design Principles
//!
//! - Stores are opaque blob maps (`contains` / `read` / `write`)
//! - Segment ids are allocated through the store so it can intern or
//!   index them
//! - A segment, once written, is never mutated again
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and ephemeral repositories
//!
//! ## Example
//!
//! ```rust
//! use cairn_store::{MemoryStore, SegmentStore};
//!
//! let store = MemoryStore::new();
//! let id = store.new_data_segment_id();
//! store.write_segment(id, b"segment bytes").unwrap();
//! assert!(store.contains_segment(id));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod id;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use id::{SegmentId, SegmentType};
pub use memory::MemoryStore;
pub use store::SegmentStore;
