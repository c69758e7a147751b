//! # notidock
//!
//! Container lifecycle notifications with sliding-window throttling.
//!
//! The crate watches a container runtime's event stream, filters events by
//! container labels, action and exit code, and forwards the survivors to
//! notification channels such as Slack. A per-container throttle keeps a
//! crash-looping container from flooding the channel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notidock::{NotificationThrottler, ThrottlePolicy};
//! use chrono::{TimeDelta, Utc};
//!
//! // At most 20 notifications per container per minute, then 5 minutes of silence.
//! let throttler = NotificationThrottler::builder()
//!     .with_window(TimeDelta::seconds(60))
//!     .with_threshold(20)
//!     .with_cooldown(TimeDelta::minutes(5))
//!     .build();
//!
//! if throttler.should_notify("web", "nginx:1.27", Utc::now()) {
//!     // deliver the notification
//! }
//! ```
//!
//! ## Throttling Model
//!
//! Each `(container name, image)` pair owns a sliding window made of 5-second
//! buckets. Every candidate notification is counted; once the in-window total
//! exceeds the threshold the container is **suspended**. While suspended every
//! notification is denied and nothing is counted. The first event at least
//! `cooldown` after the suspension clears it, empties the window and is then
//! evaluated as a fresh event.
//!
//! ```text
//! Unseen ──first event──▶ Active ──total > threshold──▶ Suspended
//!                           ▲                              │
//!                           └──── event after cooldown ────┘
//! ```
//!
//! A threshold of zero or less disables throttling entirely; no state is
//! kept in that mode.
//!
//! ## Reclaiming Idle State
//!
//! State is never evicted on the decision path. A [`Reclaimer`] sweeps
//! periodically (hourly by default) and removes containers whose window has
//! fully expired and whose cooldown has passed:
//!
//! ```rust,no_run
//! # use notidock::{NotificationThrottler, Reclaimer, ReclaimerConfig};
//! # use tokio_util::sync::CancellationToken;
//! # async fn example() {
//! let throttler = NotificationThrottler::builder().build();
//! let shutdown = CancellationToken::new();
//! let reclaimer = Reclaimer::new(&throttler, ReclaimerConfig::default()).spawn(shutdown.clone());
//!
//! // ... run ...
//!
//! reclaimer.shutdown().await.expect("reclaimer stopped cleanly");
//! # }
//! ```
//!
//! ## Filtering With Labels
//!
//! | Label | Effect |
//! |-------|--------|
//! | `notidock.exclude` | never notify for this container |
//! | `notidock.include` | notify even when not monitoring all containers |
//! | `notidock.name` | display (and throttling) name |
//! | `notidock.events` | comma list of actions, overrides the global list |
//! | `notidock.exitcodes` | comma list of exit codes, overrides the global list |
//!
//! ## Observability
//!
//! ```rust,no_run
//! # use notidock::NotificationThrottler;
//! # let throttler = NotificationThrottler::builder().build();
//! let snapshot = throttler.metrics().snapshot();
//! println!("allowed: {}", snapshot.notifications_allowed);
//! println!("throttled: {}", snapshot.notifications_throttled);
//! println!("throttle rate: {:.2}%", snapshot.throttle_rate() * 100.0);
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    entity::EntityKey,
    event::ContainerEvent,
    filter::{EventFilter, Rejection},
    notification::Notification,
    policy::{ThrottleDecision, ThrottlePolicy},
    state::EntityState,
};

pub use application::{
    delivery::NotificationManager,
    metrics::{Metrics, MetricsSnapshot},
    monitor::{Admission, EventMonitor, RunSummary, StopReason},
    ports::{Clock, EventSource, EventSourceError, NotificationError, Notifier, Storage},
    reclaimer::{Reclaimer, ReclaimerConfig, ReclaimerConfigError, ReclaimerHandle, ShutdownError},
    registry::EntityRegistry,
    throttler::{DefaultStorage, NotificationThrottler, ThrottlerBuilder},
};

pub use infrastructure::{
    clock::SystemClock,
    config::{AppConfig, ConfigError, EventInput},
    docker::{DockerEndpoint, DockerError, DockerEventSource},
    event_stream::JsonLinesSource,
    slack::SlackNotifier,
    storage::{ShardedStorage, SingleLockStorage},
};
