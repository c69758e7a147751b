//! Event monitor: filter, throttle, dispatch.
//!
//! Admission (filtering and the throttle decision) runs inline on the
//! monitor's task, so decisions follow stream order. Delivery of admitted
//! notifications runs on spawned tasks and never blocks the stream.

use crate::application::delivery::NotificationManager;
use crate::application::ports::{EventSource, EventSourceError, NotificationError, Storage};
use crate::application::throttler::NotificationThrottler;
use crate::domain::{
    entity::EntityKey,
    event::ContainerEvent,
    filter::{EventFilter, Rejection},
    notification::Notification,
    policy::ThrottleDecision,
    state::EntityState,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Outcome of presenting one event to the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Passed every check; ready for delivery
    Admit(Notification),
    /// Rejected by the label/action/exit-code filter
    Filtered(Rejection),
    /// Denied by the throttler
    Throttled(ThrottleDecision),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admit(_))
    }
}

/// How long in-flight deliveries may run once the event loop has stopped.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Why [`EventMonitor::run`] returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// The source reported end of stream
    #[default]
    SourceClosed,
    /// The shutdown token fired
    Shutdown,
    /// The source failed and cannot be read any further
    SourceFailed,
}

/// Counters for one [`EventMonitor::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub received: u64,
    pub decode_errors: u64,
    pub filtered: u64,
    pub throttled: u64,
    pub dispatched: u64,
    pub delivered: u64,
    pub delivery_failures: u64,
    /// Deliveries aborted because they outlived the drain timeout
    pub abandoned: u64,
    pub stop_reason: StopReason,
}

impl RunSummary {
    /// True if the run ended because the event source broke.
    pub fn is_failure(&self) -> bool {
        self.stop_reason == StopReason::SourceFailed
    }

    fn record_delivery(&mut self, outcome: Result<Result<(), NotificationError>, JoinError>) {
        match outcome {
            Ok(Ok(())) => self.delivered += 1,
            // Already logged per notifier.
            Ok(Err(_)) => self.delivery_failures += 1,
            Err(e) => {
                error!(error = %e, "notification task failed");
                self.delivery_failures += 1;
            }
        }
    }
}

/// Drives events from a source through filtering and throttling to delivery.
pub struct EventMonitor<S>
where
    S: Storage<EntityKey, EntityState> + Clone,
{
    filter: EventFilter,
    throttler: NotificationThrottler<S>,
    notifications: Arc<NotificationManager>,
    drain_timeout: Duration,
}

impl<S> EventMonitor<S>
where
    S: Storage<EntityKey, EntityState> + Clone,
{
    pub fn new(
        filter: EventFilter,
        throttler: NotificationThrottler<S>,
        notifications: NotificationManager,
    ) -> Self {
        Self {
            filter,
            throttler,
            notifications: Arc::new(notifications),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Bound the time spent waiting on in-flight deliveries after the loop
    /// stops. Deliveries still running afterwards are aborted.
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Decide what happens to `event`, consuming one throttle slot if it
    /// passes the filter.
    ///
    /// `now` is the decision time; the notification itself carries the
    /// event's own timestamp when it has one.
    pub fn admit(&self, event: &ContainerEvent, now: DateTime<Utc>) -> Admission {
        if let Err(rejection) = self.filter.evaluate(event) {
            trace!(action = %event.action, reason = %rejection, "event filtered");
            return Admission::Filtered(rejection);
        }

        let name = self.filter.container_name(event.labels());
        let key = EntityKey::new(name, event.image());
        let decision = self.throttler.decide(&key, now);

        if decision.is_deny() {
            info!(
                container = name,
                image = event.image(),
                action = %event.action,
                "notification throttled"
            );
            return Admission::Throttled(decision);
        }

        Admission::Admit(Notification::from_event(event, name, now))
    }

    /// Consume `source` until it closes or `shutdown` fires.
    ///
    /// In-flight deliveries are awaited for at most the drain timeout before
    /// returning. A decode error skips the offending event; a read error ends
    /// the run.
    pub async fn run<E>(&self, source: &mut E, shutdown: CancellationToken) -> RunSummary
    where
        E: EventSource + ?Sized,
    {
        let mut summary = RunSummary::default();
        let mut deliveries = JoinSet::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("shutdown requested, stopping event monitor");
                    summary.stop_reason = StopReason::Shutdown;
                    break;
                }
                Some(outcome) = deliveries.join_next(), if !deliveries.is_empty() => {
                    summary.record_delivery(outcome);
                    continue;
                }
                next = source.next_event() => next,
            };

            let event = match next {
                None => {
                    info!("event stream closed");
                    summary.stop_reason = StopReason::SourceClosed;
                    break;
                }
                Some(Err(EventSourceError::Decode(e))) => {
                    summary.decode_errors += 1;
                    warn!(error = %e, "skipping undecodable event");
                    continue;
                }
                Some(Err(e)) => {
                    error!(error = %e, "event stream failed");
                    summary.stop_reason = StopReason::SourceFailed;
                    break;
                }
                Some(Ok(event)) => event,
            };

            summary.received += 1;
            match self.admit(&event, self.throttler.now()) {
                Admission::Admit(notification) => {
                    summary.dispatched += 1;
                    let notifications = Arc::clone(&self.notifications);
                    deliveries.spawn(async move { notifications.send(&notification).await });
                }
                Admission::Filtered(_) => summary.filtered += 1,
                Admission::Throttled(_) => summary.throttled += 1,
            }
        }

        if !deliveries.is_empty() {
            debug!(pending = deliveries.len(), "waiting for in-flight notifications");
        }
        let drain = async {
            while let Some(outcome) = deliveries.join_next().await {
                summary.record_delivery(outcome);
            }
        };
        if tokio::time::timeout(self.drain_timeout, drain).await.is_err() {
            let abandoned = deliveries.len();
            deliveries.abort_all();
            warn!(
                abandoned,
                timeout = ?self.drain_timeout,
                "abandoning in-flight notifications"
            );
            summary.abandoned += abandoned as u64;
        }

        summary
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    pub fn throttler(&self) -> &NotificationThrottler<S> {
        &self.throttler
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::{LABEL_EXCLUDE, LABEL_NAME};
    use crate::infrastructure::mocks::MockNotifier;
    use chrono::{TimeDelta, TimeZone};
    use tokio::sync::mpsc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn event(name: &str, action: &str) -> ContainerEvent {
        let mut event = ContainerEvent {
            kind: "container".to_string(),
            action: action.to_string(),
            time: 1_717_243_200,
            ..Default::default()
        };
        let attributes = &mut event.actor.attributes;
        attributes.insert("name".to_string(), name.to_string());
        attributes.insert("image".to_string(), "nginx:1.27".to_string());
        event
    }

    fn monitor(threshold: i64, notifier: Arc<MockNotifier>) -> EventMonitor<crate::application::throttler::DefaultStorage> {
        let filter = EventFilter::new(true, vec!["start".to_string(), "die".to_string()], vec![]);
        let throttler = NotificationThrottler::builder()
            .with_window(TimeDelta::seconds(60))
            .with_threshold(threshold)
            .with_cooldown(TimeDelta::seconds(30))
            .build();
        EventMonitor::new(filter, throttler, NotificationManager::new().with_notifier(notifier))
    }

    #[test]
    fn test_admit_builds_notification() {
        let monitor = monitor(5, Arc::new(MockNotifier::new("mock")));
        let mut event = event("web", "start");
        event.actor.attributes.insert(LABEL_NAME.to_string(), "frontend".to_string());

        match monitor.admit(&event, t0()) {
            Admission::Admit(notification) => {
                assert_eq!(notification.container_name, "frontend");
                assert_eq!(notification.action, "start");
            }
            other => panic!("expected admission, got {other:?}"),
        }
    }

    #[test]
    fn test_filtered_events_do_not_consume_throttle_slots() {
        let monitor = monitor(1, Arc::new(MockNotifier::new("mock")));

        assert_eq!(
            monitor.admit(&event("web", "exec_start"), t0()),
            Admission::Filtered(Rejection::UntrackedAction)
        );
        let mut excluded = event("web", "start");
        excluded.actor.attributes.insert(LABEL_EXCLUDE.to_string(), String::new());
        assert_eq!(
            monitor.admit(&excluded, t0()),
            Admission::Filtered(Rejection::NotMonitored)
        );

        assert_eq!(monitor.throttler().entity_count(), 0);
        assert!(monitor.admit(&event("web", "start"), t0()).is_admitted());
    }

    #[test]
    fn test_throttled_after_threshold() {
        let monitor = monitor(2, Arc::new(MockNotifier::new("mock")));

        assert!(monitor.admit(&event("web", "start"), t0()).is_admitted());
        assert!(monitor.admit(&event("web", "die"), t0()).is_admitted());
        assert_eq!(
            monitor.admit(&event("web", "start"), t0()),
            Admission::Throttled(ThrottleDecision::Suspend)
        );
        assert_eq!(
            monitor.admit(&event("web", "die"), t0() + TimeDelta::seconds(29)),
            Admission::Throttled(ThrottleDecision::Suppress)
        );
        assert!(monitor
            .admit(&event("web", "start"), t0() + TimeDelta::seconds(30))
            .is_admitted());
    }

    #[tokio::test]
    async fn test_run_until_source_closes() {
        let notifier = Arc::new(MockNotifier::new("mock"));
        let monitor = monitor(2, notifier.clone());
        let (tx, mut rx) = mpsc::channel(16);

        for action in ["start", "die", "start", "create"] {
            tx.send(event("api", action)).await.unwrap();
        }
        drop(tx);

        let summary = monitor.run(&mut rx, CancellationToken::new()).await;

        assert_eq!(summary.received, 4);
        assert_eq!(summary.dispatched, 2);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.throttled, 1);
        assert_eq!(summary.filtered, 1);
        assert_eq!(summary.stop_reason, StopReason::SourceClosed);
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_and_counts_failures() {
        let notifier = Arc::new(MockNotifier::failing("mock"));
        let monitor = monitor(10, notifier.clone());
        let (tx, mut rx) = mpsc::channel(16);
        tx.send(event("api", "start")).await.unwrap();

        let shutdown = CancellationToken::new();
        let stopper = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            stopper.cancel();
        });

        // Sender stays alive, so only the token can end the run.
        let summary = monitor.run(&mut rx, shutdown).await;
        drop(tx);

        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.delivery_failures, 1);
        assert_eq!(summary.stop_reason, StopReason::Shutdown);
        assert!(!summary.is_failure());
        assert_eq!(notifier.attempts(), 1);
    }

    #[derive(Debug)]
    struct StalledNotifier;

    #[async_trait::async_trait]
    impl crate::application::ports::Notifier for StalledNotifier {
        async fn send(&self, _: &Notification) -> Result<(), NotificationError> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_stalled_deliveries() {
        let filter = EventFilter::new(true, vec!["start".to_string()], vec![]);
        let monitor = EventMonitor::new(
            filter,
            NotificationThrottler::builder().build(),
            NotificationManager::new().with_notifier(Arc::new(StalledNotifier)),
        )
        .with_drain_timeout(Duration::from_secs(2));
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(event("api", "start")).await.unwrap();

        let shutdown = CancellationToken::new();
        let stopper = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.cancel();
        });

        let summary = tokio::time::timeout(Duration::from_secs(3), monitor.run(&mut rx, shutdown))
            .await
            .expect("run must return once the drain timeout elapses");
        drop(tx);

        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.delivered, 0);
        assert_eq!(summary.abandoned, 1);
        assert_eq!(summary.stop_reason, StopReason::Shutdown);
    }

    #[derive(Debug)]
    struct BrokenSource;

    #[async_trait::async_trait]
    impl EventSource for BrokenSource {
        async fn next_event(&mut self) -> Option<Result<ContainerEvent, EventSourceError>> {
            Some(Err(std::io::Error::other("socket closed").into()))
        }
    }

    #[tokio::test]
    async fn test_read_error_ends_run_as_failure() {
        let monitor = monitor(10, Arc::new(MockNotifier::new("mock")));
        let summary = monitor.run(&mut BrokenSource, CancellationToken::new()).await;

        assert_eq!(summary.stop_reason, StopReason::SourceFailed);
        assert!(summary.is_failure());
        assert_eq!(summary.received, 0);
    }
}
