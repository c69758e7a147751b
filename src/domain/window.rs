//! Bucketed sliding-window counter.
//!
//! Instead of storing one timestamp per event, events are batched into
//! fixed-width buckets keyed by the truncated timestamp. An entity therefore
//! holds at most `window / BUCKET_WIDTH + 1` buckets no matter how noisy it is.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use std::collections::VecDeque;

/// Width of a single bucket in seconds.
///
/// Fixed so the bucket count per entity stays bounded regardless of the
/// configured window length.
pub const BUCKET_WIDTH_SECS: i64 = 5;

/// Width of a single bucket.
pub fn bucket_width() -> TimeDelta {
    TimeDelta::seconds(BUCKET_WIDTH_SECS)
}

/// Number of events counted within one bucket-width sub-interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Start of the sub-interval (timestamp truncated to the bucket width)
    pub start: DateTime<Utc>,
    /// Events counted in this sub-interval
    pub count: u32,
}

impl Bucket {
    /// Bucket start for a timestamp.
    ///
    /// Timestamps that cannot be truncated (outside chrono's representable
    /// range) form their own bucket.
    pub fn start_for(timestamp: DateTime<Utc>) -> DateTime<Utc> {
        timestamp
            .duration_trunc(bucket_width())
            .unwrap_or(timestamp)
    }
}

/// Cutoff below which (inclusive) buckets are outside the window.
pub(crate) fn window_cutoff(now: DateTime<Utc>, window: TimeDelta) -> DateTime<Utc> {
    match now.checked_sub_signed(window) {
        Some(cutoff) => cutoff,
        None if window > TimeDelta::zero() => DateTime::<Utc>::MIN_UTC,
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// Time-bucketed event counter for one entity.
///
/// Buckets are appended in arrival order and pruned lazily on access; nothing
/// expires in the background.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketedWindow {
    buckets: VecDeque<Bucket>,
}

impl BucketedWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every bucket starting at or before `now - window`.
    ///
    /// # Returns
    /// The total count over the buckets that remain.
    pub fn prune(&mut self, now: DateTime<Utc>, window: TimeDelta) -> u64 {
        let cutoff = window_cutoff(now, window);
        self.buckets.retain(|bucket| bucket.start > cutoff);
        self.total()
    }

    /// Count one event at `now`.
    ///
    /// The current bucket is searched from the back since it is almost always
    /// the most recent one.
    pub fn record(&mut self, now: DateTime<Utc>) {
        let start = Bucket::start_for(now);
        match self.buckets.iter_mut().rev().find(|b| b.start == start) {
            Some(bucket) => bucket.count = bucket.count.saturating_add(1),
            None => self.buckets.push_back(Bucket { start, count: 1 }),
        }
    }

    /// Sum of counts over retained buckets.
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| u64::from(b.count)).sum()
    }

    /// True when no retained bucket lies inside the window ending at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        let cutoff = window_cutoff(now, window);
        self.buckets.iter().all(|bucket| bucket.start <= cutoff)
    }

    /// Remove all buckets.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Number of retained buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True if no buckets are retained.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Retained buckets, oldest first.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }
}
