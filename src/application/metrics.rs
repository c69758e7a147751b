//! Observability metrics for notification throttling.
//!
//! Provides counters about throttling behavior for monitoring and debugging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking throttling statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Notifications let through
    notifications_allowed: AtomicU64,
    /// Notifications denied, including the ones that triggered a suspension
    notifications_throttled: AtomicU64,
    /// Transitions into suspension
    suspensions: AtomicU64,
    /// Entity states removed by the reclaimer
    entities_reclaimed: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                notifications_allowed: AtomicU64::new(0),
                notifications_throttled: AtomicU64::new(0),
                suspensions: AtomicU64::new(0),
                entities_reclaimed: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_allowed(&self) {
        self.inner
            .notifications_allowed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttled(&self) {
        self.inner
            .notifications_throttled
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_suspension(&self) {
        self.inner.suspensions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reclaimed(&self, count: u64) {
        self.inner
            .entities_reclaimed
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn notifications_allowed(&self) -> u64 {
        self.inner.notifications_allowed.load(Ordering::Relaxed)
    }

    pub fn notifications_throttled(&self) -> u64 {
        self.inner.notifications_throttled.load(Ordering::Relaxed)
    }

    pub fn suspensions(&self) -> u64 {
        self.inner.suspensions.load(Ordering::Relaxed)
    }

    pub fn entities_reclaimed(&self) -> u64 {
        self.inner.entities_reclaimed.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            notifications_allowed: self.notifications_allowed(),
            notifications_throttled: self.notifications_throttled(),
            suspensions: self.suspensions(),
            entities_reclaimed: self.entities_reclaimed(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.notifications_allowed.store(0, Ordering::Relaxed);
        self.inner.notifications_throttled.store(0, Ordering::Relaxed);
        self.inner.suspensions.store(0, Ordering::Relaxed);
        self.inner.entities_reclaimed.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub notifications_allowed: u64,
    pub notifications_throttled: u64,
    pub suspensions: u64,
    pub entities_reclaimed: u64,
}

impl MetricsSnapshot {
    /// Ratio of throttled to total notifications (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been processed.
    pub fn throttle_rate(&self) -> f64 {
        let total = self.total_notifications();
        if total == 0 {
            0.0
        } else {
            self.notifications_throttled as f64 / total as f64
        }
    }

    /// Total candidate notifications seen (allowed + throttled).
    pub fn total_notifications(&self) -> u64 {
        self.notifications_allowed
            .saturating_add(self.notifications_throttled)
    }
}
