//! Container lifecycle events as delivered by the runtime's event API.
//!
//! Mirrors the JSON objects streamed by `GET /events` (and printed by
//! `docker events --format '{{json .}}'`). Unknown fields are ignored and
//! missing ones default, so partially populated events still decode.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Event type carried by container lifecycle events.
pub const CONTAINER_EVENT_TYPE: &str = "container";

/// The object an event is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Actor {
    /// Container ID
    #[serde(rename = "ID", default)]
    pub id: String,
    /// Labels plus runtime attributes (`name`, `image`, `exitCode`, ...)
    #[serde(rename = "Attributes", default)]
    pub attributes: HashMap<String, String>,
}

/// A single lifecycle event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerEvent {
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(rename = "Action", default)]
    pub action: String,
    #[serde(rename = "Actor", default)]
    pub actor: Actor,
    #[serde(default)]
    pub scope: String,
    /// Unix seconds
    #[serde(default)]
    pub time: i64,
    /// Unix nanoseconds
    #[serde(rename = "timeNano", default)]
    pub time_nano: i64,
}

impl ContainerEvent {
    /// Returns true for container-scoped events.
    pub fn is_container(&self) -> bool {
        self.kind == CONTAINER_EVENT_TYPE
    }

    pub fn labels(&self) -> &HashMap<String, String> {
        &self.actor.attributes
    }

    /// Image reference the container runs, empty if unknown.
    pub fn image(&self) -> &str {
        self.attribute("image").unwrap_or_default()
    }

    /// Exit code attribute, present on `die` events.
    pub fn exit_code(&self) -> Option<&str> {
        self.attribute("exitCode").filter(|code| !code.is_empty())
    }

    /// Seconds the container ran, present on `die` events.
    pub fn exec_duration(&self) -> Option<i64> {
        self.attribute("execDuration")?.parse().ok()
    }

    /// Event time, preferring the nanosecond field.
    ///
    /// `None` when the event carries neither field.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match (self.time_nano, self.time) {
            (0, 0) => None,
            (0, secs) => DateTime::from_timestamp(secs, 0),
            (nanos, _) => Some(DateTime::from_timestamp_nanos(nanos)),
        }
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.actor.attributes.get(key).map(String::as_str)
    }
}
