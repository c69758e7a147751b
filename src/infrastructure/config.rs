//! Process configuration from `NOTIDOCK_*` environment variables.
//!
//! Unset or empty variables take their defaults. A value that is present but
//! cannot be parsed is an error rather than a silent fallback.

use crate::application::reclaimer::ReclaimerConfig;
use crate::domain::filter::{split_list, EventFilter, DEFAULT_TRACKED_EVENTS};
use crate::domain::policy::ThrottlePolicy;
use crate::infrastructure::docker::DockerEndpoint;
use chrono::TimeDelta;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Prefix shared by every variable.
pub const ENV_PREFIX: &str = "NOTIDOCK_";

pub const KEY_MONITOR_ALL: &str = "MONITOR_ALL";
pub const KEY_TRACKED_EVENTS: &str = "TRACKED_EVENTS";
pub const KEY_TRACKED_EXIT_CODES: &str = "TRACKED_EXITCODES";
pub const KEY_WINDOW_DURATION: &str = "WINDOW_DURATION";
pub const KEY_EVENT_THRESHOLD: &str = "EVENT_THRESHOLD";
pub const KEY_NOTIFICATION_COOLDOWN: &str = "NOTIFICATION_COOLDOWN";
pub const KEY_CLEANUP_INTERVAL: &str = "CLEANUP_INTERVAL";
pub const KEY_SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";
pub const KEY_DOCKER_SOCKET: &str = "DOCKER_SOCKET";
pub const KEY_EVENT_SOURCE: &str = "EVENT_SOURCE";

const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Errors raised while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str, reason: impl ToString) -> Self {
        ConfigError::InvalidValue {
            key: format!("{ENV_PREFIX}{key}"),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Where the process reads events from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventInput {
    /// The runtime API at [`AppConfig::docker_socket`]
    #[default]
    Docker,
    /// JSON lines piped in on stdin
    Stdin,
}

impl EventInput {
    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "docker" => Some(EventInput::Docker),
            "stdin" => Some(EventInput::Stdin),
            _ => None,
        }
    }
}

impl fmt::Display for EventInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventInput::Docker => f.write_str("docker"),
            EventInput::Stdin => f.write_str("stdin"),
        }
    }
}

/// Effective process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    // Container monitoring
    pub monitor_all: bool,
    pub tracked_events: Vec<String>,
    /// Empty means every exit code
    pub tracked_exit_codes: Vec<String>,

    // Throttling
    pub window: TimeDelta,
    /// Zero or negative disables throttling
    pub event_threshold: i64,
    pub notification_cooldown: TimeDelta,
    pub cleanup_interval: Duration,

    // Delivery
    pub slack_webhook_url: Option<String>,

    // Event input
    pub event_input: EventInput,
    pub docker_socket: DockerEndpoint,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            monitor_all: false,
            tracked_events: DEFAULT_TRACKED_EVENTS.iter().map(|e| e.to_string()).collect(),
            tracked_exit_codes: Vec::new(),
            window: TimeDelta::seconds(ThrottlePolicy::DEFAULT_WINDOW_SECS),
            event_threshold: ThrottlePolicy::DEFAULT_THRESHOLD,
            notification_cooldown: TimeDelta::zero(),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            slack_webhook_url: None,
            event_input: EventInput::default(),
            docker_socket: DockerEndpoint::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve full variable names.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for the first value that does not
    /// parse, for a zero cleanup interval, or for a socket address that is not
    /// `unix://` or `tcp://`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}")).filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let monitor_all = get(KEY_MONITOR_ALL).map_or(defaults.monitor_all, |v| v == "true");
        let tracked_events = get(KEY_TRACKED_EVENTS).map_or(defaults.tracked_events, |v| parse_list(&v));
        let tracked_exit_codes =
            get(KEY_TRACKED_EXIT_CODES).map_or(defaults.tracked_exit_codes, |v| parse_list(&v));

        let window = match get(KEY_WINDOW_DURATION) {
            Some(v) => parse_time_delta(KEY_WINDOW_DURATION, &v)?,
            None => defaults.window,
        };
        let event_threshold = match get(KEY_EVENT_THRESHOLD) {
            Some(v) => v
                .trim()
                .parse::<i64>()
                .map_err(|e| ConfigError::invalid(KEY_EVENT_THRESHOLD, &v, e))?,
            None => defaults.event_threshold,
        };
        let notification_cooldown = match get(KEY_NOTIFICATION_COOLDOWN) {
            Some(v) => parse_time_delta(KEY_NOTIFICATION_COOLDOWN, &v)?,
            None => defaults.notification_cooldown,
        };
        let cleanup_interval = match get(KEY_CLEANUP_INTERVAL) {
            Some(v) => {
                let interval = parse_duration(KEY_CLEANUP_INTERVAL, &v)?;
                ReclaimerConfig::new(interval)
                    .map_err(|e| ConfigError::invalid(KEY_CLEANUP_INTERVAL, &v, e))?
                    .interval
            }
            None => defaults.cleanup_interval,
        };
        let event_input = match get(KEY_EVENT_SOURCE) {
            Some(v) => EventInput::parse(&v).ok_or_else(|| {
                ConfigError::invalid(KEY_EVENT_SOURCE, &v, "expected docker or stdin")
            })?,
            None => defaults.event_input,
        };
        let docker_socket = match get(KEY_DOCKER_SOCKET) {
            Some(v) => DockerEndpoint::parse(v.trim())
                .map_err(|e| ConfigError::invalid(KEY_DOCKER_SOCKET, &v, e))?,
            None => defaults.docker_socket,
        };

        Ok(Self {
            monitor_all,
            tracked_events,
            tracked_exit_codes,
            window,
            event_threshold,
            notification_cooldown,
            cleanup_interval,
            slack_webhook_url: get(KEY_SLACK_WEBHOOK_URL),
            event_input,
            docker_socket,
        })
    }

    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy::new(self.window, self.event_threshold, self.notification_cooldown)
    }

    pub fn reclaimer_config(&self) -> ReclaimerConfig {
        ReclaimerConfig {
            interval: self.cleanup_interval,
        }
    }

    pub fn event_filter(&self) -> EventFilter {
        EventFilter::new(
            self.monitor_all,
            self.tracked_events.clone(),
            self.tracked_exit_codes.clone(),
        )
    }

    /// Log the effective configuration at info level.
    pub fn log_summary(&self) {
        info!(
            monitor_all = self.monitor_all,
            tracked_events = ?self.tracked_events,
            tracked_exit_codes = %format_exit_codes(&self.tracked_exit_codes),
            "container monitoring settings"
        );
        info!(
            window = %format_delta(self.window),
            event_threshold = self.event_threshold,
            notification_cooldown = %format_delta(self.notification_cooldown),
            cleanup_interval = %humantime::format_duration(self.cleanup_interval),
            "throttling settings"
        );
        info!(
            slack = self.slack_webhook_url.is_some(),
            "notification settings"
        );
        info!(
            source = %self.event_input,
            docker_socket = %self.docker_socket,
            "event source settings"
        );
    }
}

fn parse_list(value: &str) -> Vec<String> {
    split_list(value).map(str::to_string).collect()
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::invalid(key, value, e))
}

fn parse_time_delta(key: &str, value: &str) -> Result<TimeDelta, ConfigError> {
    let duration = parse_duration(key, value)?;
    TimeDelta::from_std(duration).map_err(|e| ConfigError::invalid(key, value, e))
}

fn format_exit_codes(codes: &[String]) -> String {
    if codes.is_empty() {
        "all".to_string()
    } else {
        codes.join(",")
    }
}

fn format_delta(delta: TimeDelta) -> String {
    match delta.to_std() {
        Ok(d) if !d.is_zero() => humantime::format_duration(d).to_string(),
        Ok(_) => "disabled".to_string(),
        Err(_) => delta.to_string(),
    }
}
