//! Mock clock for testing.

use crate::application::ports::Clock;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex};

/// Mock clock for testing.
///
/// Allows tests to control time progression explicitly, enabling deterministic
/// testing of window and cooldown behavior.
///
/// # Examples
///
/// ```ignore
/// use notidock::infrastructure::mocks::MockClock;
/// use notidock::application::ports::Clock;
/// use chrono::{TimeDelta, TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
/// let clock = MockClock::new(start);
///
/// // Time starts at the specified instant
/// assert_eq!(clock.now(), start);
///
/// // Advance time explicitly
/// clock.advance(TimeDelta::seconds(10));
/// assert_eq!(clock.now(), start + TimeDelta::seconds(10));
///
/// // Or set to a specific instant
/// let new_time = start + TimeDelta::seconds(100);
/// clock.set(new_time);
/// assert_eq!(clock.now(), new_time);
/// ```
///
/// # Thread Safety
///
/// All clones share the same underlying time value, so advancing time in
/// one clone affects all clones.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific instant.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a (possibly negative) delta.
    pub fn advance(&self, delta: TimeDelta) {
        let mut time = self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time += delta;
    }

    /// Set the clock to a specific instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut time = self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::thread;

    #[test]
    fn test_mock_clock() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let clock = MockClock::new(start);

        assert_eq!(clock.now(), start);

        clock.advance(TimeDelta::seconds(10));
        assert_eq!(clock.now(), start + TimeDelta::seconds(10));

        clock.advance(TimeDelta::seconds(-4));
        assert_eq!(clock.now(), start + TimeDelta::seconds(6));
    }

    #[test]
    fn test_clones_share_time() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let clock = MockClock::new(start);
        let clock_clone = clock.clone();

        thread::spawn(move || clock_clone.advance(TimeDelta::seconds(5)))
            .join()
            .unwrap();

        assert_eq!(clock.now(), start + TimeDelta::seconds(5));
    }
}
