//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs mock)
//! - Storage implementations (single lock and sharded maps)
//! - Event sources (runtime API, JSON lines, channels)
//! - Notification channels (Slack)
//! - Process concerns: configuration, logging, signals

pub mod clock;
pub mod config;
pub mod docker;
pub mod event_stream;
pub mod signals;
pub mod slack;
pub mod storage;
pub mod telemetry;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides controllable test doubles for the
/// clock and notification ports.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// notidock = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
