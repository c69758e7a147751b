//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Entity registry (storage of per-entity throttle state)
//! - Notification throttler (decision making)
//! - Reclaimer (periodic removal of idle state)
//! - Event monitor and notification fan-out
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod delivery;
pub mod metrics;
pub mod monitor;
pub mod ports;
pub mod reclaimer;
pub mod registry;
pub mod throttler;
