//! Wire types for rebook
//!
//! This crate defines the stable shapes shared by the store, the workflow
//! engine and the HTTP service:
//! - Booking, date, slot and expert records
//! - Reschedule requests and the views built from them
//! - Request and response bodies
//! - Error codes

mod requests;
mod responses;
mod types;

pub use requests::*;
pub use responses::*;
pub use types::*;
