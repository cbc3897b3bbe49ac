//! Store trait definitions

use rebook_api::{Booking, DateEntry, Expert, RescheduleAction, RescheduleRequest, Slot};
use rebook_util::{BookingId, DateId, ExpertId, SlotId};

use crate::{AuditEvent, StoreResult};

/// Booking records. Creation belongs to the booking flow; this side reads
/// and rewrites them.
pub trait BookingStore: Send + Sync {
    /// Look up a booking by id
    fn find_booking(&self, id: &BookingId) -> StoreResult<Option<Booking>>;

    /// Insert or replace a booking
    fn save_booking(&self, booking: &Booking) -> StoreResult<()>;
}

/// Expert calendar: dates and the slots they own
pub trait AvailabilityStore: Send + Sync {
    fn find_date(&self, id: &DateId) -> StoreResult<Option<DateEntry>>;

    fn find_slot(&self, id: &SlotId) -> StoreResult<Option<Slot>>;

    fn save_date(&self, date: &DateEntry) -> StoreResult<()>;

    fn save_slot(&self, slot: &Slot) -> StoreResult<()>;
}

/// Expert display records
pub trait ExpertDirectory: Send + Sync {
    fn find_expert(&self, id: &ExpertId) -> StoreResult<Option<Expert>>;

    fn save_expert(&self, expert: &Expert) -> StoreResult<()>;
}

/// Pending reschedule requests, at most one per booking
pub trait RescheduleRepository: Send + Sync {
    /// Persist a new request.
    ///
    /// Fails with [`crate::StoreError::Conflict`] when the booking already has
    /// a pending request. The check is the storage constraint itself, so two
    /// racing callers cannot both succeed.
    fn create_request(
        &self,
        booking_id: &BookingId,
        date_id: &DateId,
        slot_id: &SlotId,
    ) -> StoreResult<RescheduleRequest>;

    /// All pending requests, oldest first
    fn list_requests(&self) -> StoreResult<Vec<RescheduleRequest>>;

    /// Pending requests whose booking belongs to `expert_id`, oldest first
    fn list_requests_for_expert(&self, expert_id: &ExpertId) -> StoreResult<Vec<RescheduleRequest>>;

    /// The pending request for a booking, if any
    fn find_request_by_booking(&self, booking_id: &BookingId) -> StoreResult<Option<RescheduleRequest>>;

    /// Remove the pending request for a booking. Returns whether one existed.
    fn delete_request_by_booking(&self, booking_id: &BookingId) -> StoreResult<bool>;

    /// Resolve `request` in one transaction.
    ///
    /// `Accepted` moves the booking to the requested date and slot, marks it
    /// RESCHEDULED and deletes the request; `Rejected` only deletes the
    /// request. Returns the updated booking on accept. Fails with
    /// [`crate::StoreError::NotFound`] and changes nothing if the request was
    /// already resolved or the booking vanished, and with
    /// [`crate::StoreError::Conflict`] when accepting against a cancelled or
    /// completed booking.
    fn resolve_request(
        &self,
        request: &RescheduleRequest,
        action: RescheduleAction,
    ) -> StoreResult<Option<Booking>>;

    /// Delete requests whose booking already sits on the requested date and
    /// slot with status RESCHEDULED. Returns the removed requests.
    fn delete_stale_requests(&self) -> StoreResult<Vec<RescheduleRequest>>;
}

/// Append-only audit trail
pub trait AuditLog: Send + Sync {
    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;
}

/// Everything the reschedule service needs from storage
pub trait Store:
    BookingStore + AvailabilityStore + ExpertDirectory + RescheduleRepository + AuditLog
{
    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
