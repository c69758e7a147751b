//! Label-driven inclusion and exclusion of container events.
//!
//! Containers opt in or out through `notidock.*` labels; per-container labels
//! override the globally configured action and exit-code lists.

use crate::domain::event::ContainerEvent;
use std::collections::HashMap;
use std::fmt;

/// Prefix shared by all control labels.
pub const LABEL_PREFIX: &str = "notidock.";
/// Never notify for this container.
pub const LABEL_EXCLUDE: &str = "notidock.exclude";
/// Notify for this container even when not monitoring all containers.
pub const LABEL_INCLUDE: &str = "notidock.include";
/// Display name overriding the container name.
pub const LABEL_NAME: &str = "notidock.name";
/// Comma-separated actions to notify on for this container.
pub const LABEL_EVENTS: &str = "notidock.events";
/// Comma-separated exit codes to notify on for this container.
pub const LABEL_EXIT_CODES: &str = "notidock.exitcodes";

/// Actions tracked when nothing else is configured.
pub const DEFAULT_TRACKED_EVENTS: [&str; 5] = ["create", "start", "die", "stop", "kill"];

/// Why an event was not forwarded to the throttler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Not a container event
    NotContainer,
    /// Container excluded by label or not included
    NotMonitored,
    /// Action not in the tracked list
    UntrackedAction,
    /// Exit code not in the tracked list
    UntrackedExitCode,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::NotContainer => "not a container event",
            Rejection::NotMonitored => "container not monitored",
            Rejection::UntrackedAction => "action not tracked",
            Rejection::UntrackedExitCode => "exit code not tracked",
        };
        f.write_str(reason)
    }
}

/// Inclusion policy applied before throttling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    monitor_all: bool,
    tracked_events: Vec<String>,
    tracked_exit_codes: Vec<String>,
}

impl EventFilter {
    /// Create a filter.
    ///
    /// # Arguments
    /// * `monitor_all` - Monitor every container not explicitly excluded
    /// * `tracked_events` - Actions to notify on
    /// * `tracked_exit_codes` - Exit codes to notify on; empty means all
    pub fn new(monitor_all: bool, tracked_events: Vec<String>, tracked_exit_codes: Vec<String>) -> Self {
        Self {
            monitor_all,
            tracked_events,
            tracked_exit_codes,
        }
    }

    /// Check an event against every rule, in order.
    pub fn evaluate(&self, event: &ContainerEvent) -> Result<(), Rejection> {
        if !event.is_container() {
            return Err(Rejection::NotContainer);
        }
        let labels = event.labels();
        if !self.should_monitor_container(labels) {
            return Err(Rejection::NotMonitored);
        }
        if !self.should_track_action(&event.action, labels) {
            return Err(Rejection::UntrackedAction);
        }
        if let Some(code) = event.exit_code() {
            if !self.should_track_exit_code(code, labels) {
                return Err(Rejection::UntrackedExitCode);
            }
        }
        Ok(())
    }

    /// Exclusion label wins over everything, then `monitor_all`, then the
    /// inclusion label.
    pub fn should_monitor_container(&self, labels: &HashMap<String, String>) -> bool {
        if labels.contains_key(LABEL_EXCLUDE) {
            return false;
        }
        self.monitor_all || labels.contains_key(LABEL_INCLUDE)
    }

    pub fn should_track_action(&self, action: &str, labels: &HashMap<String, String>) -> bool {
        match labels.get(LABEL_EVENTS) {
            Some(list) => split_list(list).any(|tracked| tracked == action),
            None => self.tracked_events.iter().any(|tracked| tracked.trim() == action),
        }
    }

    pub fn should_track_exit_code(&self, code: &str, labels: &HashMap<String, String>) -> bool {
        if let Some(list) = labels.get(LABEL_EXIT_CODES) {
            return split_list(list).any(|tracked| tracked == code);
        }
        self.tracked_exit_codes.is_empty() || self.tracked_exit_codes.iter().any(|c| c == code)
    }

    /// Name shown in notifications and used for throttling.
    pub fn container_name<'a>(&self, labels: &'a HashMap<String, String>) -> &'a str {
        labels
            .get(LABEL_NAME)
            .or_else(|| labels.get("name"))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn monitor_all(&self) -> bool {
        self.monitor_all
    }

    pub fn tracked_events(&self) -> &[String] {
        &self.tracked_events
    }

    pub fn tracked_exit_codes(&self) -> &[String] {
        &self.tracked_exit_codes
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new(
            false,
            DEFAULT_TRACKED_EVENTS.iter().map(|e| e.to_string()).collect(),
            Vec::new(),
        )
    }
}

/// Split a comma-separated label value, trimming and skipping empties.
pub fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|item| !item.is_empty())
}
