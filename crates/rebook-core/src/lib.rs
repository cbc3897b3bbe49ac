//! Reschedule workflow engine for rebookd
//!
//! This crate contains:
//! - The reschedule state machine (NoRequest -> Pending -> Accepted/Rejected -> NoRequest)
//! - Input validation with per-field errors
//! - Read-side projections joining requests with bookings, experts, dates and slots
//! - Reconciliation of requests left behind by a half-applied accept

mod engine;
mod error;
mod projection;

#[cfg(test)]
mod testing;

pub use engine::*;
pub use error::*;
pub use projection::*;
