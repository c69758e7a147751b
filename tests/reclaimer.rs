//! Integration tests for the background reclaimer task.

use chrono::{TimeDelta, Utc};
use notidock::{NotificationThrottler, Reclaimer, ReclaimerConfig};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_reclaimer_removes_stale_state_in_background() {
    let throttler = NotificationThrottler::builder()
        .with_window(TimeDelta::seconds(10))
        .with_threshold(5)
        .build();

    // Events far enough in the past that their window is already over.
    let past = Utc::now() - TimeDelta::minutes(5);
    for i in 0..20 {
        throttler.should_notify(&format!("c{i}"), "img", past);
    }
    throttler.should_notify("live", "img", Utc::now());
    assert_eq!(throttler.entity_count(), 21);

    let config = ReclaimerConfig::new(Duration::from_millis(20)).unwrap();
    let handle = Reclaimer::new(&throttler, config).spawn(CancellationToken::new());

    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.shutdown().await.unwrap();

    assert_eq!(throttler.entity_count(), 1);
    assert_eq!(throttler.metrics().entities_reclaimed(), 20);
}

#[tokio::test]
async fn test_shutdown_before_first_tick() {
    let throttler = NotificationThrottler::builder().build();
    throttler.should_notify("c", "img", Utc::now() - TimeDelta::hours(2));

    let handle =
        Reclaimer::new(&throttler, ReclaimerConfig::default()).spawn(CancellationToken::new());
    handle.shutdown().await.unwrap();

    // The first sweep is one full interval away, so nothing was reclaimed.
    assert_eq!(throttler.entity_count(), 1);
}

#[tokio::test]
async fn test_cancel_via_handle_and_parent() {
    let throttler = NotificationThrottler::builder().build();
    let parent = CancellationToken::new();

    let first = Reclaimer::new(&throttler, ReclaimerConfig::default()).spawn(parent.clone());
    let second = Reclaimer::new(&throttler, ReclaimerConfig::default()).spawn(parent.clone());

    first.cancel();
    first.shutdown().await.unwrap();
    assert!(!parent.is_cancelled());

    parent.cancel();
    second.shutdown().await.unwrap();
}
