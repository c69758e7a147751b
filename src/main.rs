//! `notidock` binary.
//!
//! Streams events from the runtime socket (`NOTIDOCK_DOCKER_SOCKET`). With
//! `NOTIDOCK_EVENT_SOURCE=stdin` it reads JSON lines instead:
//!
//! ```text
//! docker events --filter type=container --format '{{json .}}' | notidock
//! ```

use notidock::infrastructure::{signals::wait_for_shutdown_signal, telemetry::init_tracing};
use notidock::{
    AppConfig, DockerEventSource, EventInput, EventMonitor, EventSource, JsonLinesSource,
    NotificationManager, NotificationThrottler, Reclaimer, SlackNotifier,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    config.log_summary();

    let mut source: Box<dyn EventSource> = match config.event_input {
        EventInput::Docker => match DockerEventSource::connect(&config.docker_socket).await {
            Ok(source) => Box::new(source),
            Err(e) => {
                error!(error = %e, "container runtime unavailable");
                return ExitCode::FAILURE;
            }
        },
        EventInput::Stdin => {
            info!("reading events from stdin");
            Box::new(JsonLinesSource::stdin())
        }
    };

    let throttler = NotificationThrottler::with_policy(config.throttle_policy());
    let shutdown = CancellationToken::new();
    let reclaimer = Reclaimer::new(&throttler, config.reclaimer_config()).spawn(shutdown.clone());

    let mut notifications = NotificationManager::new();
    if let Some(url) = &config.slack_webhook_url {
        match SlackNotifier::new(url) {
            Ok(slack) => notifications.add_notifier(Arc::new(slack)),
            Err(e) => error!(error = %e, "failed to initialize slack notifier"),
        }
    }
    if notifications.is_empty() {
        warn!("no notifiers configured, admitted events will only be logged");
    }

    let monitor = EventMonitor::new(config.event_filter(), throttler.clone(), notifications);

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => {
                info!("shutdown signal received");
                signal_token.cancel();
            }
            Err(e) => warn!(error = %e, "signal handling unavailable"),
        }
    });

    let summary = monitor.run(source.as_mut(), shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = reclaimer.shutdown().await {
        error!(error = %e, "reclaimer did not stop cleanly");
    }

    let metrics = throttler.metrics().snapshot();
    info!(
        received = summary.received,
        filtered = summary.filtered,
        throttled = summary.throttled,
        delivered = summary.delivered,
        delivery_failures = summary.delivery_failures,
        abandoned = summary.abandoned,
        stop_reason = ?summary.stop_reason,
        suspensions = metrics.suspensions,
        reclaimed = metrics.entities_reclaimed,
        "notidock stopped"
    );

    if summary.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
