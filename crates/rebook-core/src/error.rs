//! Workflow error taxonomy

use rebook_api::FieldError;
use rebook_store::StoreError;
use rebook_util::{BookingId, ExpertId};
use std::fmt;
use thiserror::Error;

/// What could not be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundKind {
    Booking(BookingId),
    Expert(ExpertId),
    /// The booking exists but has no pending reschedule request
    PendingRequest(BookingId),
    /// The expert exists but none of their bookings has a pending request
    RequestsForExpert(ExpertId),
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundKind::Booking(id) => write!(f, "booking {id} not found"),
            NotFoundKind::Expert(id) => write!(f, "expert {id} not found"),
            NotFoundKind::PendingRequest(id) => {
                write!(f, "no pending reschedule request for booking {id}")
            }
            NotFoundKind::RequestsForExpert(id) => {
                write!(f, "no reschedule requests for expert {id}")
            }
        }
    }
}

/// Errors produced by the reschedule workflow
#[derive(Debug, Error)]
pub enum RescheduleError {
    /// Malformed or unacceptable input, one entry per offending field
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    NotFound(NotFoundKind),

    /// The booking already has a pending request
    #[error("{0}")]
    Conflict(String),

    /// Unrecognized decision action
    #[error("invalid action '{0}': expected 'accepted' or 'rejected'")]
    InvalidArgument(String),

    /// The booking was updated but its request could not be removed
    #[error("booking {booking_id} needs reconciliation: {detail}")]
    Consistency { booking_id: BookingId, detail: String },

    #[error("internal error: {0}")]
    Internal(String),
}

fn summarize(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl RescheduleError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<StoreError> for RescheduleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => RescheduleError::Conflict(msg),
            StoreError::Inconsistent { booking_id, detail } => {
                RescheduleError::Consistency { booking_id, detail }
            }
            other => RescheduleError::Internal(other.to_string()),
        }
    }
}

pub type RescheduleResult<T> = Result<T, RescheduleError>;
