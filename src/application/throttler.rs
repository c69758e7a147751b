//! Throttle decision engine.
//!
//! Decides, once per candidate notification and strictly before dispatch,
//! whether the notification may proceed. Decisions for a key are linearizable:
//! the whole look-up/prune/record/compare sequence runs inside the storage
//! lock.

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Storage};
use crate::application::registry::EntityRegistry;
use crate::domain::{
    entity::EntityKey,
    policy::{ThrottleDecision, ThrottlePolicy},
    state::EntityState,
};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::SingleLockStorage;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::debug;

/// Storage used unless another backend is supplied: one lock for all keys.
pub type DefaultStorage = Arc<SingleLockStorage<EntityKey, EntityState>>;

/// Sliding-window notification throttler.
///
/// Cheap to clone; clones share state, metrics and clock.
#[derive(Clone)]
pub struct NotificationThrottler<S = DefaultStorage>
where
    S: Storage<EntityKey, EntityState> + Clone,
{
    registry: EntityRegistry<S>,
    policy: ThrottlePolicy,
    metrics: Metrics,
}

impl<S> NotificationThrottler<S>
where
    S: Storage<EntityKey, EntityState> + Clone,
{
    /// Create a throttler.
    ///
    /// # Arguments
    /// * `registry` - Entity state registry (which contains the clock)
    /// * `policy` - Window, threshold and cooldown
    /// * `metrics` - Metrics tracker
    pub fn new(registry: EntityRegistry<S>, policy: ThrottlePolicy, metrics: Metrics) -> Self {
        Self {
            registry,
            policy,
            metrics,
        }
    }

    /// Decide the fate of one candidate notification for `key` at `now`.
    ///
    /// With throttling disabled this returns `Allow` without touching the
    /// registry, so no entity state is ever allocated.
    ///
    /// Callers must present events for one key in non-decreasing `now` order.
    pub fn decide(&self, key: &EntityKey, now: DateTime<Utc>) -> ThrottleDecision {
        if self.policy.is_disabled() {
            self.metrics.record_allowed();
            return ThrottleDecision::Allow;
        }

        let decision = self
            .registry
            .with_entity_state(key, |state| state.register_event(now, &self.policy));

        match decision {
            ThrottleDecision::Allow => self.metrics.record_allowed(),
            ThrottleDecision::Suspend => {
                self.metrics.record_throttled();
                self.metrics.record_suspension();
                debug!(
                    container = key.name(),
                    image = key.image_tag(),
                    threshold = self.policy.threshold(),
                    "entity suspended"
                );
            }
            ThrottleDecision::Suppress => self.metrics.record_throttled(),
        }

        decision
    }

    /// Returns true if a notification for `(name, image_tag)` may be sent at `now`.
    pub fn should_notify(&self, name: &str, image_tag: &str, now: DateTime<Utc>) -> bool {
        self.decide(&EntityKey::new(name, image_tag), now).is_allow()
    }

    /// Same as [`should_notify`](Self::should_notify), timestamped by the clock.
    pub fn should_notify_now(&self, name: &str, image_tag: &str) -> bool {
        self.should_notify(name, image_tag, self.now())
    }

    /// Current time according to the throttler's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.registry.now()
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    pub fn registry(&self) -> &EntityRegistry<S> {
        &self.registry
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Number of entities currently holding state.
    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }
}

impl NotificationThrottler<DefaultStorage> {
    /// Create a builder for configuring the throttler.
    ///
    /// Defaults:
    /// - Window: 60 seconds
    /// - Threshold: 20 events per window
    /// - Cooldown: none
    /// - Clock: system clock
    pub fn builder() -> ThrottlerBuilder {
        ThrottlerBuilder {
            policy: ThrottlePolicy::default(),
            clock: None,
            metrics: None,
        }
    }

    /// Create a throttler with the given policy and default everything else.
    pub fn with_policy(policy: ThrottlePolicy) -> Self {
        Self::builder().with_policy(policy).build()
    }
}

/// Builder for [`NotificationThrottler`].
pub struct ThrottlerBuilder {
    policy: ThrottlePolicy,
    clock: Option<Arc<dyn Clock>>,
    metrics: Option<Metrics>,
}

impl ThrottlerBuilder {
    /// Replace the whole policy.
    pub fn with_policy(mut self, policy: ThrottlePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_window(mut self, window: TimeDelta) -> Self {
        self.policy = self.policy.with_window(window);
        self
    }

    /// Events allowed per window; zero or negative disables throttling.
    pub fn with_threshold(mut self, threshold: i64) -> Self {
        self.policy = self.policy.with_threshold(threshold);
        self
    }

    pub fn with_cooldown(mut self, cooldown: TimeDelta) -> Self {
        self.policy = self.policy.with_cooldown(cooldown);
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share an existing metrics tracker.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build over the default single-lock storage.
    pub fn build(self) -> NotificationThrottler<DefaultStorage> {
        self.build_with_storage(Arc::new(SingleLockStorage::new()))
    }

    /// Build over a caller-supplied storage backend.
    pub fn build_with_storage<S>(self, storage: S) -> NotificationThrottler<S>
    where
        S: Storage<EntityKey, EntityState> + Clone,
    {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);
        let registry = EntityRegistry::new(storage, clock);
        NotificationThrottler::new(registry, self.policy, self.metrics.unwrap_or_default())
    }
}
