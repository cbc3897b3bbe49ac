//! Shared test fixtures

use chrono::NaiveDate;
use rebook_api::{
    Availability, Booking, BookingStatus, DateEntry, DecideRescheduleBody, Expert,
    RescheduleAction, RescheduleRequest, Slot, SubmitRescheduleBody,
};
use rebook_store::{
    AuditEvent, AuditLog, AvailabilityStore, BookingStore, ExpertDirectory, RescheduleRepository,
    SqliteStore, Store, StoreError, StoreResult,
};
use rebook_util::{BookingId, DateId, ExpertId, SlotId};
use std::sync::Arc;

pub fn oid(n: u32) -> String {
    format!("{:024x}", n)
}

pub fn oid_slot(n: u32) -> SlotId {
    SlotId::parse(&oid(n)).unwrap()
}

fn slot(n: u32, expert: &Expert, timing: &str, availability: Availability) -> Slot {
    Slot {
        id: oid_slot(n),
        expert_id: expert.id.clone(),
        plan_id: None,
        timing: timing.into(),
        period: "AM".into(),
        availability,
    }
}

/// One expert with a confirmed booking and a free slot on another day.
///
/// The booking sits on the first date's first slot; `old_slot_spare` is a second
/// slot on the same day, and `new_slot` is the only slot of `new_date`.
pub struct World {
    pub store: Arc<SqliteStore>,
    pub expert: Expert,
    pub booking: Booking,
    pub old_slot_spare: Slot,
    pub new_date: DateEntry,
    pub new_slot: Slot,
}

impl World {
    pub fn new() -> Self {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let expert = Expert {
            id: ExpertId::parse(&oid(0xe1)).unwrap(),
            username: "mira".into(),
            fullname: "Mira Holt".into(),
            expertise: Some("yoga".into()),
        };

        let old_slot = slot(0x51, &expert, "09:00", Availability::Booked);
        let old_slot_spare = slot(0x52, &expert, "10:00", Availability::Available);
        let new_slot = slot(0x55, &expert, "11:00", Availability::Available);

        let old_date = DateEntry {
            id: DateId::parse(&oid(0xd1)).unwrap(),
            expert_id: expert.id.clone(),
            date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            availability: Availability::Available,
            slot_ids: vec![old_slot.id.clone(), old_slot_spare.id.clone()],
        };
        let new_date = DateEntry {
            id: DateId::parse(&oid(0xd2)).unwrap(),
            expert_id: expert.id.clone(),
            date: NaiveDate::from_ymd_opt(2025, 5, 9).unwrap(),
            availability: Availability::Available,
            slot_ids: vec![new_slot.id.clone()],
        };

        let booking = Booking {
            id: BookingId::parse(&oid(0xb1)).unwrap(),
            expert_id: expert.id.clone(),
            plan_id: None,
            guest_name: "Sam".into(),
            date_id: old_date.id.clone(),
            slot_id: old_slot.id.clone(),
            status: BookingStatus::Confirmed,
        };

        store.save_expert(&expert).unwrap();
        for s in [&old_slot, &old_slot_spare, &new_slot] {
            store.save_slot(s).unwrap();
        }
        store.save_date(&old_date).unwrap();
        store.save_date(&new_date).unwrap();
        store.save_booking(&booking).unwrap();

        Self {
            store,
            expert,
            booking,
            old_slot_spare,
            new_date,
            new_slot,
        }
    }

    pub fn submit_body(&self) -> SubmitRescheduleBody {
        SubmitRescheduleBody {
            current_booking_id: self.booking.id.to_string(),
            requested_date_id: self.new_date.id.to_string(),
            requested_slot_id: self.new_slot.id.to_string(),
        }
    }

    /// Decision body echoing the ids of `submit_body`
    pub fn decide_body(&self, action: &str) -> DecideRescheduleBody {
        DecideRescheduleBody {
            current_booking_id: self.booking.id.to_string(),
            requested_date_id: Some(self.new_date.id.to_string()),
            requested_slot_id: Some(self.new_slot.id.to_string()),
            action: action.into(),
        }
    }

    /// Decision body naming only the booking
    pub fn decide_body_bare(&self, action: &str) -> DecideRescheduleBody {
        DecideRescheduleBody {
            current_booking_id: self.booking.id.to_string(),
            requested_date_id: None,
            requested_slot_id: None,
            action: action.into(),
        }
    }

    /// Store a request for `submit_body` directly
    pub fn file_request(&self) -> RescheduleRequest {
        self.store
            .create_request(&self.booking.id, &self.new_date.id, &self.new_slot.id)
            .unwrap()
    }

    pub fn current_booking(&self) -> Booking {
        self.store.find_booking(&self.booking.id).unwrap().unwrap()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Resolving reports a half-applied accept
    Inconsistent,
    /// Expert, date and slot lookups fail
    Lookups,
}

/// Store wrapper that injects failures into an otherwise working store
pub struct FaultyStore {
    inner: Arc<SqliteStore>,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(inner: Arc<SqliteStore>, fault: Fault) -> Self {
        Self { inner, fault }
    }

    fn lookup_failure(&self) -> StoreResult<()> {
        if self.fault == Fault::Lookups {
            return Err(StoreError::Database("injected lookup failure".into()));
        }
        Ok(())
    }
}

impl BookingStore for FaultyStore {
    fn find_booking(&self, id: &BookingId) -> StoreResult<Option<Booking>> {
        self.inner.find_booking(id)
    }

    fn save_booking(&self, booking: &Booking) -> StoreResult<()> {
        self.inner.save_booking(booking)
    }
}

impl AvailabilityStore for FaultyStore {
    fn find_date(&self, id: &DateId) -> StoreResult<Option<DateEntry>> {
        self.lookup_failure()?;
        self.inner.find_date(id)
    }

    fn find_slot(&self, id: &SlotId) -> StoreResult<Option<Slot>> {
        self.lookup_failure()?;
        self.inner.find_slot(id)
    }

    fn save_date(&self, date: &DateEntry) -> StoreResult<()> {
        self.inner.save_date(date)
    }

    fn save_slot(&self, slot: &Slot) -> StoreResult<()> {
        self.inner.save_slot(slot)
    }
}

impl ExpertDirectory for FaultyStore {
    fn find_expert(&self, id: &ExpertId) -> StoreResult<Option<Expert>> {
        self.lookup_failure()?;
        self.inner.find_expert(id)
    }

    fn save_expert(&self, expert: &Expert) -> StoreResult<()> {
        self.inner.save_expert(expert)
    }
}

impl RescheduleRepository for FaultyStore {
    fn create_request(
        &self,
        booking_id: &BookingId,
        date_id: &DateId,
        slot_id: &SlotId,
    ) -> StoreResult<RescheduleRequest> {
        self.inner.create_request(booking_id, date_id, slot_id)
    }

    fn list_requests(&self) -> StoreResult<Vec<RescheduleRequest>> {
        self.inner.list_requests()
    }

    fn list_requests_for_expert(&self, expert_id: &ExpertId) -> StoreResult<Vec<RescheduleRequest>> {
        self.inner.list_requests_for_expert(expert_id)
    }

    fn find_request_by_booking(&self, booking_id: &BookingId) -> StoreResult<Option<RescheduleRequest>> {
        self.inner.find_request_by_booking(booking_id)
    }

    fn delete_request_by_booking(&self, booking_id: &BookingId) -> StoreResult<bool> {
        self.inner.delete_request_by_booking(booking_id)
    }

    fn resolve_request(
        &self,
        request: &RescheduleRequest,
        action: RescheduleAction,
    ) -> StoreResult<Option<Booking>> {
        if self.fault == Fault::Inconsistent {
            return Err(StoreError::Inconsistent {
                booking_id: request.current_booking_id.clone(),
                detail: "injected delete and rollback failure".into(),
            });
        }
        self.inner.resolve_request(request, action)
    }

    fn delete_stale_requests(&self) -> StoreResult<Vec<RescheduleRequest>> {
        self.inner.delete_stale_requests()
    }
}

impl AuditLog for FaultyStore {
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()> {
        self.inner.append_audit(event)
    }

    fn recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        self.inner.recent_audits(limit)
    }
}

impl Store for FaultyStore {
    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }
}
