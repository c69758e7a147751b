//! Per-entity throttling state machine.
//!
//! ```text
//! Unseen ──first event──▶ Active ──total > threshold──▶ Suspended
//!                           ▲                               │
//!                           └──── cooldown elapsed ─────────┘
//! ```
//!
//! `Unseen` has no representation: state is created lazily by the store on
//! the first event and removed only by the reclaimer.

use crate::domain::policy::{ThrottleDecision, ThrottlePolicy};
use crate::domain::window::BucketedWindow;
use chrono::{DateTime, Utc};

/// Mutable throttling record for one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityState {
    window: BucketedWindow,
    suspended_since: Option<DateTime<Utc>>,
}

impl EntityState {
    /// Fresh state with an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a candidate notification at `now` and decide its fate.
    ///
    /// Events arriving while suspended are not counted. The event that pushes
    /// the window total over the threshold is counted and then denied.
    pub fn register_event(&mut self, now: DateTime<Utc>, policy: &ThrottlePolicy) -> ThrottleDecision {
        if policy.is_disabled() {
            return ThrottleDecision::Allow;
        }

        if let Some(since) = self.suspended_since {
            if now.signed_duration_since(since) < policy.cooldown() {
                return ThrottleDecision::Suppress;
            }
            // Re-armed entities start from an empty window
            self.suspended_since = None;
            self.window.clear();
        }

        let total = self.window.prune(now, policy.window()) + 1;
        self.window.record(now);

        if policy.exceeds(total) {
            self.suspended_since = Some(now);
            ThrottleDecision::Suspend
        } else {
            ThrottleDecision::Allow
        }
    }

    /// Whether the reclaimer may drop this state at `now`.
    ///
    /// True once every bucket has left the window and any suspension is older
    /// than the cooldown.
    pub fn is_reclaimable(&self, now: DateTime<Utc>, policy: &ThrottlePolicy) -> bool {
        let suspension_over = match self.suspended_since {
            None => true,
            Some(since) => now.signed_duration_since(since) > policy.cooldown(),
        };
        suspension_over && self.window.is_expired(now, policy.window())
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_since.is_some()
    }

    /// When the current suspension started, if suspended.
    pub fn suspended_since(&self) -> Option<DateTime<Utc>> {
        self.suspended_since
    }

    pub fn window(&self) -> &BucketedWindow {
        &self.window
    }
}
