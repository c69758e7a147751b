//! Background reclamation of idle entity state.
//!
//! Entity state is never evicted on the decision path; instead a periodic
//! sweep removes entities whose window has fully expired and whose cooldown
//! (if any) has elapsed.

use crate::application::ports::Storage;
use crate::application::throttler::NotificationThrottler;
use crate::domain::{entity::EntityKey, state::EntityState};
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Error returned when reclaimer configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReclaimerConfigError {
    /// Sweep interval must be greater than zero
    ZeroInterval,
}

impl std::fmt::Display for ReclaimerConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReclaimerConfigError::ZeroInterval => {
                write!(f, "cleanup interval must be greater than 0")
            }
        }
    }
}

impl std::error::Error for ReclaimerConfigError {}

/// Configuration for the background sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimerConfig {
    /// How often to sweep
    pub interval: Duration,
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
        }
    }
}

impl ReclaimerConfig {
    /// Create a new reclaimer config with the specified interval.
    ///
    /// # Errors
    /// Returns `ReclaimerConfigError::ZeroInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, ReclaimerConfigError> {
        if interval.is_zero() {
            return Err(ReclaimerConfigError::ZeroInterval);
        }
        Ok(Self { interval })
    }
}

/// Error returned when the background task did not stop cleanly.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("reclaimer task panicked")]
    Panicked,

    #[error("reclaimer task was aborted")]
    Aborted,
}

/// Periodically removes idle entity state from a throttler's registry.
pub struct Reclaimer<S>
where
    S: Storage<EntityKey, EntityState> + Clone,
{
    throttler: NotificationThrottler<S>,
    config: ReclaimerConfig,
}

impl<S> Reclaimer<S>
where
    S: Storage<EntityKey, EntityState> + Clone,
{
    /// Create a reclaimer sharing state with `throttler`.
    pub fn new(throttler: &NotificationThrottler<S>, config: ReclaimerConfig) -> Self {
        Self {
            throttler: throttler.clone(),
            config,
        }
    }

    /// Remove every reclaimable entity as of `now`, returning how many went.
    ///
    /// An entity is reclaimable when all its buckets are at or before
    /// `now - window` and it is either not suspended or its cooldown has
    /// strictly elapsed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let policy = *self.throttler.policy();
        let registry = self.throttler.registry();

        // Idle sweeps stay on the read path.
        let mut candidates = 0usize;
        registry.for_each(|_, state| {
            if state.is_reclaimable(now, &policy) {
                candidates += 1;
            }
        });
        if candidates == 0 {
            trace!(tracked = registry.len(), "nothing to reclaim");
            return 0;
        }

        let mut removed = 0usize;
        registry.cleanup(|_, state| {
            let reclaim = state.is_reclaimable(now, &policy);
            if reclaim {
                removed += 1;
            }
            !reclaim
        });

        self.throttler.metrics().record_reclaimed(removed as u64);
        debug!(removed, remaining = registry.len(), "reclaimed idle entity state");
        removed
    }

    /// Sweep using the throttler's clock.
    pub fn sweep_now(&self) -> usize {
        self.sweep(self.throttler.now())
    }

    /// Start sweeping periodically on the tokio runtime.
    ///
    /// The first sweep runs one interval after start. The task stops when
    /// `cancel` (or the returned handle) is cancelled.
    pub fn spawn(self, cancel: CancellationToken) -> ReclaimerHandle
    where
        S: 'static,
    {
        let token = cancel.child_token();
        let task_token = token.clone();
        let period = self.config.interval;

        let join = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep_now();
                    }
                }
            }
            debug!("reclaimer stopped");
        });

        ReclaimerHandle { cancel: token, join }
    }

    pub fn config(&self) -> &ReclaimerConfig {
        &self.config
    }
}

/// Handle to a running reclaimer task.
#[derive(Debug)]
pub struct ReclaimerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl ReclaimerHandle {
    /// Signal the task to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the task and wait for it to finish.
    ///
    /// A sweep in progress completes before the task exits.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        self.cancel.cancel();
        match self.join.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_panic() => Err(ShutdownError::Panicked),
            Err(_) => Err(ShutdownError::Aborted),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
