//! Segment allocation tracking.

use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks segment allocation across all writers of one store.
///
/// The tracker hands out the monotonically increasing sequence number
/// stamped into each segment's metadata record, so the allocation order of
/// segments can be recovered from the segments themselves.
#[derive(Debug, Default)]
pub struct SegmentTracker {
    segment_counter: AtomicU64,
}

impl SegmentTracker {
    /// Creates a new tracker starting at sequence number zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next segment sequence number.
    ///
    /// Each call returns a value one greater than the previous call,
    /// starting from 1.
    pub fn next_segment_number(&self) -> u64 {
        self.segment_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns the number of segments allocated so far.
    #[must_use]
    pub fn segment_count(&self) -> u64 {
        self.segment_counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn sequence_numbers_increase() {
        let tracker = SegmentTracker::new();
        assert_eq!(tracker.segment_count(), 0);
        assert_eq!(tracker.next_segment_number(), 1);
        assert_eq!(tracker.next_segment_number(), 2);
        assert_eq!(tracker.segment_count(), 2);
    }

    #[test]
    fn shared_tracker_never_repeats() {
        let tracker = Arc::new(SegmentTracker::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    (0..100).map(|_| tracker.next_segment_number()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
    }
}
