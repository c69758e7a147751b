//! Mock notifier for testing.

use crate::application::ports::{NotificationError, Notifier};
use crate::domain::notification::Notification;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Notifier that records what it is asked to send.
///
/// A failing mock still counts attempts but records nothing as sent.
///
/// # Examples
///
/// ```ignore
/// use notidock::infrastructure::mocks::MockNotifier;
///
/// let notifier = MockNotifier::new("test");
/// assert!(notifier.sent().is_empty());
/// assert_eq!(notifier.attempts(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockNotifier {
    name: String,
    fail: bool,
    attempts: Arc<Mutex<usize>>,
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MockNotifier {
    /// A notifier whose every send succeeds.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail: false,
            attempts: Arc::new(Mutex::new(0)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A notifier whose every send fails with `NotificationError::Failed`.
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    /// Notifications successfully "sent" so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("MockNotifier mutex poisoned").clone()
    }

    /// Number of send calls, successful or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().expect("MockNotifier mutex poisoned")
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        *self.attempts.lock().expect("MockNotifier mutex poisoned") += 1;
        if self.fail {
            return Err(NotificationError::Failed(format!("{} unavailable", self.name)));
        }
        self.sent
            .lock()
            .expect("MockNotifier mutex poisoned")
            .push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
