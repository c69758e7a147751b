//! Notification payload handed to delivery channels.

use crate::domain::event::ContainerEvent;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

/// A container event that passed filtering and throttling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub container_name: String,
    pub action: String,
    pub time: DateTime<Utc>,
    /// All attributes of the event actor, sorted for stable rendering
    pub labels: BTreeMap<String, String>,
    pub exit_code: Option<String>,
    /// Human-readable run time, e.g. `1m 30s`
    pub exec_duration: Option<String>,
}

impl Notification {
    /// Build a notification from a runtime event.
    ///
    /// `fallback_time` is used when the event carries no usable timestamp.
    pub fn from_event(event: &ContainerEvent, container_name: &str, fallback_time: DateTime<Utc>) -> Self {
        Self {
            container_name: container_name.to_string(),
            action: event.action.clone(),
            time: event.timestamp().unwrap_or(fallback_time),
            labels: event
                .labels()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            exit_code: event.exit_code().map(str::to_string),
            exec_duration: event.exec_duration().map(format_exec_duration),
        }
    }

    /// Event time as RFC 3339 with second precision.
    pub fn formatted_time(&self) -> String {
        self.time.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Render a run time in seconds as `Xd Yh Zm`, `Yh Zm`, `Zm Ss` or `Ss`.
pub fn format_exec_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_exec_duration() {
        assert_eq!(format_exec_duration(0), "0s");
        assert_eq!(format_exec_duration(45), "45s");
        assert_eq!(format_exec_duration(90), "1m 30s");
        assert_eq!(format_exec_duration(3_725), "1h 2m");
        assert_eq!(format_exec_duration(90_061), "1d 1h 1m");
        assert_eq!(format_exec_duration(-5), "0s");
    }

    #[test]
    fn test_from_event() {
        let mut event = ContainerEvent {
            kind: "container".to_string(),
            action: "die".to_string(),
            time: 1_734_197_676,
            ..Default::default()
        };
        for (k, v) in [("exitCode", "1"), ("execDuration", "90"), ("env", "prod")] {
            event.actor.attributes.insert(k.to_string(), v.to_string());
        }

        let fallback = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let notification = Notification::from_event(&event, "web", fallback);

        assert_eq!(notification.container_name, "web");
        assert_eq!(notification.action, "die");
        assert_eq!(notification.formatted_time(), "2024-12-14T17:34:36Z");
        assert_eq!(notification.exit_code.as_deref(), Some("1"));
        assert_eq!(notification.exec_duration.as_deref(), Some("1m 30s"));
        assert_eq!(notification.labels.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_fallback_time_without_timestamp() {
        let event = ContainerEvent::default();
        let fallback = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let notification = Notification::from_event(&event, "x", fallback);
        assert_eq!(notification.time, fallback);
        assert_eq!(notification.exit_code, None);
        assert_eq!(notification.exec_duration, None);
    }
}
