//! Read-side views over pending reschedule requests

use rebook_api::{AdminRequestView, Booking, ExpertRequestView, RescheduleRequest};
use rebook_store::{Store, StoreResult};
use rebook_util::{BookingId, ExpertId};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{NotFoundKind, RescheduleError, RescheduleResult};

/// Builds the request listings served to experts and admins
pub struct Projector {
    store: Arc<dyn Store>,
}

impl Projector {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Every pending request, unenriched
    pub fn list_requests(&self) -> RescheduleResult<Vec<RescheduleRequest>> {
        Ok(self.store.list_requests()?)
    }

    /// Pending requests on bookings owned by one expert, each tagged with
    /// the expert's display name.
    ///
    /// An unknown expert and an expert without pending requests are both
    /// reported as not found.
    pub fn list_for_expert(&self, raw_expert_id: &str) -> RescheduleResult<Vec<ExpertRequestView>> {
        let expert_id = ExpertId::parse(raw_expert_id)
            .map_err(|e| RescheduleError::field("expertId", e.to_string()))?;

        let expert = self
            .store
            .find_expert(&expert_id)?
            .ok_or_else(|| RescheduleError::NotFound(NotFoundKind::Expert(expert_id.clone())))?;

        let requests = self.store.list_requests_for_expert(&expert_id)?;
        if requests.is_empty() {
            return Err(RescheduleError::NotFound(NotFoundKind::RequestsForExpert(
                expert_id,
            )));
        }

        debug!(expert_id = %expert_id, count = requests.len(), "Listed requests for expert");

        Ok(requests
            .into_iter()
            .map(|request| ExpertRequestView {
                request,
                expert_id: expert.id.clone(),
                expert_name: expert.fullname.clone(),
            })
            .collect())
    }

    /// Every pending request joined with its booking, expert, requested
    /// date and requested slot. Each join is independent; a record that is
    /// missing or fails to load leaves only its own field empty.
    pub fn list_for_admin(&self) -> RescheduleResult<Vec<AdminRequestView>> {
        let requests = self.store.list_requests()?;

        Ok(requests
            .into_iter()
            .map(|request| self.enrich(request))
            .collect())
    }

    /// Look up a single booking
    pub fn find_booking(&self, raw_booking_id: &str) -> RescheduleResult<Booking> {
        let booking_id = BookingId::parse(raw_booking_id)
            .map_err(|e| RescheduleError::field("bookingId", e.to_string()))?;

        self.store
            .find_booking(&booking_id)?
            .ok_or(RescheduleError::NotFound(NotFoundKind::Booking(booking_id)))
    }

    fn enrich(&self, request: RescheduleRequest) -> AdminRequestView {
        let booking = lookup("booking", &request, self.store.find_booking(&request.current_booking_id));

        let expert = booking.as_ref().and_then(|b| {
            lookup("expert", &request, self.store.find_expert(&b.expert_id))
        });

        let date = lookup("date", &request, self.store.find_date(&request.requested_date_id));
        let slot = lookup("slot", &request, self.store.find_slot(&request.requested_slot_id));

        AdminRequestView {
            expert_name: expert.map(|e| e.fullname),
            booking_status: booking.map(|b| b.status),
            requested_date: date.as_ref().map(Into::into),
            requested_slot: slot.as_ref().map(Into::into),
            request,
        }
    }
}

fn lookup<T>(what: &str, request: &RescheduleRequest, result: StoreResult<Option<T>>) -> Option<T> {
    match result {
        Ok(found) => {
            if found.is_none() {
                debug!(request_id = %request.id, what, "Referenced record missing");
            }
            found
        }
        Err(e) => {
            warn!(request_id = %request.id, what, error = %e, "Lookup failed, leaving field empty");
            None
        }
    }
}
