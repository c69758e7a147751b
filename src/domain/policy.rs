//! Throttling policy parameters and decisions.
//!
//! A [`ThrottlePolicy`] is an explicit configuration value built once and
//! handed to the throttler; nothing reads throttling settings from global
//! state.

use chrono::TimeDelta;

/// Decision made for one candidate notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Let the notification through
    Allow,
    /// This event pushed the entity over its threshold; the entity is now
    /// suspended and the event itself is denied
    Suspend,
    /// The entity is cooling down from an earlier suspension
    Suppress,
}

impl ThrottleDecision {
    /// Returns true if the notification may be dispatched.
    pub fn is_allow(&self) -> bool {
        matches!(self, ThrottleDecision::Allow)
    }

    /// Returns true if the notification must be dropped.
    pub fn is_deny(&self) -> bool {
        !self.is_allow()
    }
}

/// Parameters of the sliding-window throttle.
///
/// Degenerate values are accepted rather than rejected:
/// - `threshold <= 0` disables throttling entirely
/// - a zero or negative `cooldown` re-arms an entity on its next event
/// - a zero or negative `window` forgets every event before the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    window: TimeDelta,
    threshold: i64,
    cooldown: TimeDelta,
}

impl ThrottlePolicy {
    /// Default sliding window length in seconds.
    pub const DEFAULT_WINDOW_SECS: i64 = 60;

    /// Default number of events allowed per window.
    pub const DEFAULT_THRESHOLD: i64 = 20;

    /// Create a policy.
    ///
    /// # Arguments
    /// * `window` - Trailing duration over which events are counted
    /// * `threshold` - Events allowed per window; the next one suspends
    /// * `cooldown` - Minimum time an entity stays suspended
    pub fn new(window: TimeDelta, threshold: i64, cooldown: TimeDelta) -> Self {
        Self {
            window,
            threshold,
            cooldown,
        }
    }

    /// A policy that allows everything.
    pub fn disabled() -> Self {
        Self {
            threshold: 0,
            ..Self::default()
        }
    }

    /// Set the window length.
    pub fn with_window(mut self, window: TimeDelta) -> Self {
        self.window = window;
        self
    }

    /// Set the per-window threshold.
    pub fn with_threshold(mut self, threshold: i64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the suspension cooldown.
    pub fn with_cooldown(mut self, cooldown: TimeDelta) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    /// Throttling is disabled when the threshold is zero or negative.
    pub fn is_disabled(&self) -> bool {
        self.threshold <= 0
    }

    /// Returns true if `total` events in one window is over the limit.
    pub fn exceeds(&self, total: u64) -> bool {
        i64::try_from(total).map_or(true, |total| total > self.threshold)
    }
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            window: TimeDelta::seconds(Self::DEFAULT_WINDOW_SECS),
            threshold: Self::DEFAULT_THRESHOLD,
            cooldown: TimeDelta::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = ThrottlePolicy::default();
        assert_eq!(policy.window(), TimeDelta::seconds(60));
        assert_eq!(policy.threshold(), 20);
        assert_eq!(policy.cooldown(), TimeDelta::zero());
        assert!(!policy.is_disabled());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let policy = ThrottlePolicy::default().with_threshold(3);
        assert!(!policy.exceeds(3));
        assert!(policy.exceeds(4));
    }

    #[test]
    fn test_non_positive_threshold_disables() {
        assert!(ThrottlePolicy::disabled().is_disabled());
        assert!(ThrottlePolicy::default().with_threshold(-1).is_disabled());
    }

    #[test]
    fn test_negative_durations_are_kept() {
        let policy = ThrottlePolicy::new(TimeDelta::seconds(-1), 5, TimeDelta::seconds(-2));
        assert_eq!(policy.window(), TimeDelta::seconds(-1));
        assert_eq!(policy.cooldown(), TimeDelta::seconds(-2));
    }

    #[test]
    fn test_decision_helpers() {
        assert!(ThrottleDecision::Allow.is_allow());
        assert!(ThrottleDecision::Suspend.is_deny());
        assert!(ThrottleDecision::Suppress.is_deny());
    }
}
