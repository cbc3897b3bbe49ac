//! Persistence layer for rebookd
//!
//! Provides:
//! - Booking, date/slot and expert lookups (records owned by other services)
//! - Reschedule request repository with one pending request per booking
//! - Atomic resolution of a request against its booking
//! - Audit log (append-only)
//! - Fixture import for seeding the external records

mod audit;
mod fixtures;
mod sqlite;
mod traits;

pub use audit::*;
pub use fixtures::*;
pub use sqlite::*;
pub use traits::*;

use rebook_util::BookingId;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A uniqueness constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A multi-step write could neither complete nor be rolled back
    #[error("Inconsistent state for booking {booking_id}: {detail}")]
    Inconsistent { booking_id: BookingId, detail: String },
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
