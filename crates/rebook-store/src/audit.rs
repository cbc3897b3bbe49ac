//! Audit event types

use chrono::{DateTime, Utc};
use rebook_util::{BookingId, DateId, RequestId, SlotId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// External records loaded from a fixture file
    FixturesImported {
        experts: usize,
        dates: usize,
        slots: usize,
        bookings: usize,
    },

    /// Reschedule request filed
    RescheduleSubmitted {
        request_id: RequestId,
        booking_id: BookingId,
        requested_date_id: DateId,
        requested_slot_id: SlotId,
    },

    /// Request accepted, booking moved
    RescheduleAccepted {
        request_id: RequestId,
        booking_id: BookingId,
        date_id: DateId,
        slot_id: SlotId,
    },

    /// Request rejected, booking untouched
    RescheduleRejected {
        request_id: RequestId,
        booking_id: BookingId,
    },

    /// Booking and request disagree after a failed resolution
    ConsistencyFailure { booking_id: BookingId, detail: String },

    /// Stale requests removed by reconciliation
    StaleRequestsRemoved { booking_ids: Vec<BookingId> },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: rebook_util::now(),
            event,
        }
    }
}
