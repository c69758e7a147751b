//! Fan-out of notifications to every configured channel.

use crate::application::ports::{NotificationError, Notifier};
use crate::domain::notification::Notification;
use std::sync::Arc;
use tracing::{debug, error};

/// Sends each notification through all registered notifiers.
///
/// Every notifier is attempted even when an earlier one fails; each failure
/// is logged and the last one is returned.
#[derive(Debug, Clone, Default)]
pub struct NotificationManager {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register another channel.
    pub fn add_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Builder-style variant of [`add_notifier`](Self::add_notifier).
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.add_notifier(notifier);
        self
    }

    pub fn notifiers(&self) -> &[Arc<dyn Notifier>] {
        &self.notifiers
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Deliver `notification` through every notifier.
    ///
    /// # Errors
    /// Returns the error of the last notifier that failed, if any did.
    pub async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let mut last_error = None;

        for notifier in &self.notifiers {
            match notifier.send(notification).await {
                Ok(()) => debug!(
                    notifier = notifier.name(),
                    container = %notification.container_name,
                    action = %notification.action,
                    "notification sent"
                ),
                Err(e) => {
                    error!(
                        notifier = notifier.name(),
                        container = %notification.container_name,
                        error = %e,
                        "failed to send notification"
                    );
                    last_error = Some(e);
                }
            }
        }

        last_error.map_or(Ok(()), Err)
    }
}
