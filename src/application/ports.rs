//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::{event::ContainerEvent, notification::Notification};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

/// Port for obtaining current time.
///
/// Wall-clock time is required because window buckets are aligned to
/// wall-clock boundaries. Infrastructure provides `SystemClock` and, for
/// tests, `MockClock`.
pub trait Clock: Send + Sync + Debug {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Port for concurrent key-value storage.
///
/// Every read and write of a value happens inside the storage's lock; callers
/// only ever see values through the closures passed in.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// The key is only cloned when a new entry has to be inserted.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    ///
    /// # Returns
    /// The result from the accessor function
    fn with_entry_mut<F, R>(&self, key: &K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Read an entry without creating it.
    fn with_entry<F, R>(&self, key: &K, accessor: F) -> Option<R>
    where
        F: FnOnce(&V) -> R;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Iterate over all entries, providing access to both key and value.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}

// Lets an `Arc` of any backend be shared between the throttler and reclaimer.
impl<K, V, T> Storage<K, V> for std::sync::Arc<T>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
    T: Storage<K, V>,
{
    fn with_entry_mut<F, R>(&self, key: &K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        (**self).with_entry_mut(key, factory, accessor)
    }

    fn with_entry<F, R>(&self, key: &K, accessor: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        (**self).with_entry(key, accessor)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V),
    {
        (**self).for_each(f)
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        (**self).retain(f)
    }
}

/// Errors raised while delivering a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The channel is misconfigured.
    #[error("invalid webhook URL: {0}")]
    InvalidWebhookUrl(String),

    /// The request could not be sent or its response not read.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The channel answered with a non-success status.
    #[error("notification rejected with status {0}")]
    Status(u16),

    /// Any other delivery failure.
    #[error("notification failed: {0}")]
    Failed(String),
}

/// Port for an outbound notification channel.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;

    /// Short channel name used in logs.
    fn name(&self) -> &str;
}

/// Errors raised while reading the event stream.
///
/// Decode errors are per-event: the stream stays usable and the caller is
/// expected to log and continue. The other variants end the stream.
#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("failed to read event stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("container runtime event stream failed: {0}")]
    Runtime(#[from] bollard::errors::Error),

    #[error("failed to decode event: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Port for the container runtime's event stream.
///
/// Implementations must be cancellation safe: dropping a pending
/// `next_event` future must not lose an event.
#[async_trait]
pub trait EventSource: Send {
    /// Next event, or `None` once the stream has closed.
    async fn next_event(&mut self) -> Option<Result<ContainerEvent, EventSourceError>>;
}
