//! Shared utilities for rebook
//!
//! This crate provides:
//! - Record ID types (BookingId, DateId, SlotId, ExpertId, PlanId, RequestId)
//! - ID parsing errors
//! - Wall-clock helpers
//! - Default paths for config and data directories

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
