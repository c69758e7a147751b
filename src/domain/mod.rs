//! Domain layer - pure throttling and event logic with no I/O.
//!
//! This layer contains the core concepts and invariants of the system:
//! - Entity identity and per-entity throttling state
//! - The bucketed sliding-window counter
//! - Throttling policy parameters and decisions
//! - Container events, label filtering and notification payloads
//!
//! All types in this layer are pure and easily testable.

pub mod entity;
pub mod event;
pub mod filter;
pub mod notification;
pub mod policy;
pub mod state;
pub mod window;
