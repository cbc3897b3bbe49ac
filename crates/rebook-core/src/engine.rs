//! Reschedule workflow engine
//!
//! Per booking the workflow is a small state machine:
//!
//! ```text
//! NoRequest --submit--> Pending --accept--> (booking moved) --> NoRequest
//!                              \--reject--> (booking kept)  --> NoRequest
//! ```
//!
//! A resolved request is deleted, so the booking can be rescheduled again
//! later. The "one pending request per booking" rule and the
//! accept-then-delete pair are both enforced by the store.

use rebook_api::{
    Booking, DecideRescheduleBody, FieldError, RescheduleAction, RescheduleRequest,
    SubmitRescheduleBody,
};
use rebook_config::RescheduleSettings;
use rebook_store::{AuditEvent, AuditEventType, Store, StoreError};
use rebook_util::{BookingId, DateId, IdError, SlotId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{NotFoundKind, RescheduleError, RescheduleResult};

/// Outcome of a reschedule decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The booking now sits on the requested date and slot
    Accepted {
        request: RescheduleRequest,
        booking: Booking,
    },
    /// The request was dropped, booking untouched
    Rejected { request: RescheduleRequest },
}

impl Decision {
    pub fn request(&self) -> &RescheduleRequest {
        match self {
            Decision::Accepted { request, .. } | Decision::Rejected { request } => request,
        }
    }
}

/// Parse one id field, recording a field error on failure
fn parse_field<T>(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: &str,
    parse: impl FnOnce(&str) -> Result<T, IdError>,
) -> Option<T> {
    match parse(value) {
        Ok(id) => Some(id),
        Err(e) => {
            errors.push(FieldError::new(field, e.to_string()));
            None
        }
    }
}

/// The reschedule workflow engine
pub struct RescheduleEngine {
    store: Arc<dyn Store>,
    settings: RescheduleSettings,
}

impl RescheduleEngine {
    /// Create a new engine over the given store
    pub fn new(store: Arc<dyn Store>, settings: RescheduleSettings) -> Self {
        info!(
            verify_slot_membership = settings.verify_slot_membership,
            "Reschedule engine initialized"
        );
        Self { store, settings }
    }

    /// File a reschedule request for a booking.
    ///
    /// Valid only while the booking has no pending request; a second submit
    /// fails with [`RescheduleError::Conflict`]. The booking itself is not
    /// touched until the request is decided.
    pub fn submit(&self, body: &SubmitRescheduleBody) -> RescheduleResult<RescheduleRequest> {
        let mut errors = Vec::new();
        let booking_id = parse_field(
            &mut errors,
            "currentBookingId",
            &body.current_booking_id,
            BookingId::parse,
        );
        let date_id = parse_field(
            &mut errors,
            "requestedDateId",
            &body.requested_date_id,
            DateId::parse,
        );
        let slot_id = parse_field(
            &mut errors,
            "requestedSlotId",
            &body.requested_slot_id,
            SlotId::parse,
        );

        let (Some(booking_id), Some(date_id), Some(slot_id)) = (booking_id, date_id, slot_id)
        else {
            return Err(RescheduleError::Validation(errors));
        };

        let booking = self
            .store
            .find_booking(&booking_id)?
            .ok_or_else(|| RescheduleError::NotFound(NotFoundKind::Booking(booking_id.clone())))?;

        if !booking.status.is_reschedulable() {
            return Err(RescheduleError::field(
                "currentBookingId",
                format!("booking is {} and cannot be rescheduled", booking.status),
            ));
        }

        if booking.date_id == date_id && booking.slot_id == slot_id {
            return Err(RescheduleError::field(
                "requestedSlotId",
                "booking already occupies the requested date and slot",
            ));
        }

        let request = self.store.create_request(&booking_id, &date_id, &slot_id)?;

        self.audit(AuditEventType::RescheduleSubmitted {
            request_id: request.id.clone(),
            booking_id: booking_id.clone(),
            requested_date_id: date_id.clone(),
            requested_slot_id: slot_id.clone(),
        });

        info!(
            request_id = %request.id,
            booking_id = %booking_id,
            date_id = %date_id,
            slot_id = %slot_id,
            "Reschedule request submitted"
        );

        Ok(request)
    }

    /// Accept or reject the pending request of a booking.
    ///
    /// The booking must exist and have a pending request. On accept the
    /// booking move and the request deletion commit together; on reject only
    /// the request is deleted. Unknown actions change nothing.
    pub fn decide(&self, body: &DecideRescheduleBody) -> RescheduleResult<Decision> {
        let mut errors = Vec::new();
        let booking_id = parse_field(
            &mut errors,
            "currentBookingId",
            &body.current_booking_id,
            BookingId::parse,
        );
        let echoed_date = body
            .requested_date_id
            .as_deref()
            .and_then(|v| parse_field(&mut errors, "requestedDateId", v, DateId::parse));
        let echoed_slot = body
            .requested_slot_id
            .as_deref()
            .and_then(|v| parse_field(&mut errors, "requestedSlotId", v, SlotId::parse));

        let Some(booking_id) = booking_id else {
            return Err(RescheduleError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(RescheduleError::Validation(errors));
        }

        let action: RescheduleAction = body
            .action
            .parse()
            .map_err(|_| RescheduleError::InvalidArgument(body.action.clone()))?;

        let Some(booking) = self.store.find_booking(&booking_id)? else {
            return Err(RescheduleError::NotFound(NotFoundKind::Booking(booking_id)));
        };

        let request = self
            .store
            .find_request_by_booking(&booking_id)?
            .ok_or_else(|| {
                RescheduleError::NotFound(NotFoundKind::PendingRequest(booking_id.clone()))
            })?;

        check_echo(&request, echoed_date.as_ref(), echoed_slot.as_ref())?;

        // A booking cancelled or completed while its request was pending can
        // only have the request rejected
        if action == RescheduleAction::Accepted && !booking.status.is_reschedulable() {
            return Err(RescheduleError::field(
                "currentBookingId",
                format!("booking is {} and cannot be rescheduled", booking.status),
            ));
        }

        if action == RescheduleAction::Accepted && self.settings.verify_slot_membership {
            self.check_requested_slot(&request)?;
        }

        let updated = match self.store.resolve_request(&request, action) {
            Ok(updated) => updated,
            Err(StoreError::NotFound { kind: "booking", .. }) => {
                return Err(RescheduleError::NotFound(NotFoundKind::Booking(booking_id)));
            }
            Err(StoreError::NotFound { .. }) => {
                return Err(RescheduleError::NotFound(NotFoundKind::PendingRequest(
                    booking_id,
                )));
            }
            Err(StoreError::Inconsistent { booking_id, detail }) => {
                error!(
                    booking_id = %booking_id,
                    request_id = %request.id,
                    detail = %detail,
                    "Reschedule left booking and request out of sync"
                );
                self.audit(AuditEventType::ConsistencyFailure {
                    booking_id: booking_id.clone(),
                    detail: detail.clone(),
                });
                return Err(RescheduleError::Consistency { booking_id, detail });
            }
            Err(e) => return Err(e.into()),
        };

        match (action, updated) {
            (RescheduleAction::Accepted, Some(booking)) => {
                self.audit(AuditEventType::RescheduleAccepted {
                    request_id: request.id.clone(),
                    booking_id: booking.id.clone(),
                    date_id: booking.date_id.clone(),
                    slot_id: booking.slot_id.clone(),
                });
                info!(
                    request_id = %request.id,
                    booking_id = %booking.id,
                    date_id = %booking.date_id,
                    slot_id = %booking.slot_id,
                    "Reschedule accepted"
                );
                Ok(Decision::Accepted { request, booking })
            }
            (RescheduleAction::Accepted, None) => Err(RescheduleError::Internal(format!(
                "booking {booking_id} missing after accepted reschedule"
            ))),
            (RescheduleAction::Rejected, _) => {
                self.audit(AuditEventType::RescheduleRejected {
                    request_id: request.id.clone(),
                    booking_id: booking_id.clone(),
                });
                info!(
                    request_id = %request.id,
                    booking_id = %booking_id,
                    "Reschedule rejected"
                );
                Ok(Decision::Rejected { request })
            }
        }
    }

    /// Remove requests whose booking already carries the requested date and
    /// slot, i.e. the residue of an accept that could not delete its request.
    pub fn reconcile(&self) -> RescheduleResult<Vec<RescheduleRequest>> {
        let removed = self.store.delete_stale_requests()?;

        if removed.is_empty() {
            debug!("No stale reschedule requests");
        } else {
            let booking_ids = removed
                .iter()
                .map(|r| r.current_booking_id.clone())
                .collect();
            self.audit(AuditEventType::StaleRequestsRemoved { booking_ids });
            warn!(count = removed.len(), "Reconciled stale reschedule requests");
        }

        Ok(removed)
    }

    /// The requested date and slot must still exist and belong together
    fn check_requested_slot(&self, request: &RescheduleRequest) -> RescheduleResult<()> {
        let mut errors = Vec::new();

        let date = self.store.find_date(&request.requested_date_id)?;
        let slot = self.store.find_slot(&request.requested_slot_id)?;

        if date.is_none() {
            errors.push(FieldError::new(
                "requestedDateId",
                format!("date {} does not exist", request.requested_date_id),
            ));
        }
        if slot.is_none() {
            errors.push(FieldError::new(
                "requestedSlotId",
                format!("slot {} does not exist", request.requested_slot_id),
            ));
        }
        if let (Some(date), Some(_)) = (&date, &slot)
            && !date.owns_slot(&request.requested_slot_id)
        {
            errors.push(FieldError::new(
                "requestedSlotId",
                format!(
                    "slot {} does not belong to date {}",
                    request.requested_slot_id, request.requested_date_id
                ),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RescheduleError::Validation(errors))
        }
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to append audit event");
        }
    }
}

/// Ids echoed in a decision must match the pending request
fn check_echo(
    request: &RescheduleRequest,
    date: Option<&DateId>,
    slot: Option<&SlotId>,
) -> RescheduleResult<()> {
    let mut errors = Vec::new();

    if let Some(date) = date
        && *date != request.requested_date_id
    {
        errors.push(FieldError::new(
            "requestedDateId",
            format!("pending request is for date {}", request.requested_date_id),
        ));
    }
    if let Some(slot) = slot
        && *slot != request.requested_slot_id
    {
        errors.push(FieldError::new(
            "requestedSlotId",
            format!("pending request is for slot {}", request.requested_slot_id),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(RescheduleError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use rebook_api::BookingStatus;
    use rebook_store::{AuditLog, BookingStore, RescheduleRepository, SqliteStore};
    use std::thread;

    fn engine(store: &Arc<SqliteStore>) -> RescheduleEngine {
        RescheduleEngine::new(store.clone(), RescheduleSettings::default())
    }

    #[test]
    fn submit_persists_request_without_touching_booking() {
        let world = World::new();
        let engine = engine(&world.store);

        let request = engine.submit(&world.submit_body()).unwrap();

        assert_eq!(request.current_booking_id, world.booking.id);
        assert_eq!(request.requested_date_id, world.new_date.id);
        assert_eq!(request.requested_slot_id, world.new_slot.id);
        assert_eq!(world.current_booking(), world.booking);
        assert_eq!(world.store.list_requests().unwrap().len(), 1);
    }

    #[test]
    fn submit_reports_every_malformed_field() {
        let world = World::new();
        let engine = engine(&world.store);

        let err = engine
            .submit(&SubmitRescheduleBody {
                current_booking_id: "B1".into(),
                requested_date_id: String::new(),
                requested_slot_id: "S5".into(),
            })
            .unwrap_err();

        match err {
            RescheduleError::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(
                    names,
                    vec!["currentBookingId", "requestedDateId", "requestedSlotId"]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(world.store.list_requests().unwrap().is_empty());
    }

    #[test]
    fn submit_for_unknown_booking_is_not_found() {
        let world = World::new();
        let engine = engine(&world.store);

        let mut body = world.submit_body();
        body.current_booking_id = oid(0xbad);

        assert!(matches!(
            engine.submit(&body),
            Err(RescheduleError::NotFound(NotFoundKind::Booking(_)))
        ));
    }

    #[test]
    fn second_submit_conflicts() {
        let world = World::new();
        let engine = engine(&world.store);

        engine.submit(&world.submit_body()).unwrap();
        let second = engine.submit(&world.submit_body());

        assert!(matches!(second, Err(RescheduleError::Conflict(_))));
        assert_eq!(world.store.list_requests().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_submits_exactly_one_wins() {
        let world = World::new();
        let engine = Arc::new(engine(&world.store));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                let body = world.submit_body();
                thread::spawn(move || engine.submit(&body))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(RescheduleError::Conflict(_))))
            .count();

        assert_eq!(wins, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(world.store.list_requests().unwrap().len(), 1);
    }

    #[test]
    fn cancelled_booking_cannot_be_rescheduled() {
        let world = World::new();
        let mut cancelled = world.booking.clone();
        cancelled.status = BookingStatus::Cancelled;
        world.store.save_booking(&cancelled).unwrap();

        let err = engine(&world.store).submit(&world.submit_body()).unwrap_err();
        assert!(matches!(err, RescheduleError::Validation(_)));
    }

    #[test]
    fn accept_after_cancellation_is_refused() {
        let world = World::new();
        let engine = engine(&world.store);
        engine.submit(&world.submit_body()).unwrap();

        let mut cancelled = world.booking.clone();
        cancelled.status = BookingStatus::Cancelled;
        world.store.save_booking(&cancelled).unwrap();

        let err = engine.decide(&world.decide_body("accepted")).unwrap_err();
        assert!(
            matches!(err, RescheduleError::Validation(ref f) if f[0].field == "currentBookingId")
        );
        assert_eq!(world.current_booking(), cancelled);
        assert!(
            world
                .store
                .find_request_by_booking(&world.booking.id)
                .unwrap()
                .is_some()
        );

        // The pending request can still be cleared
        let decision = engine.decide(&world.decide_body("rejected")).unwrap();
        assert!(matches!(decision, Decision::Rejected { .. }));
        assert_eq!(world.current_booking(), cancelled);
        assert!(world.store.list_requests().unwrap().is_empty());
    }

    #[test]
    fn submit_to_current_slot_is_rejected() {
        let world = World::new();
        let body = SubmitRescheduleBody {
            current_booking_id: world.booking.id.to_string(),
            requested_date_id: world.booking.date_id.to_string(),
            requested_slot_id: world.booking.slot_id.to_string(),
        };

        let err = engine(&world.store).submit(&body).unwrap_err();
        assert!(matches!(err, RescheduleError::Validation(_)));
    }

    #[test]
    fn accept_moves_booking_and_deletes_request() {
        let world = World::new();
        let engine = engine(&world.store);
        engine.submit(&world.submit_body()).unwrap();

        let decision = engine.decide(&world.decide_body("accepted")).unwrap();

        let Decision::Accepted { booking, .. } = decision else {
            panic!("expected accept");
        };
        assert_eq!(booking.date_id, world.new_date.id);
        assert_eq!(booking.slot_id, world.new_slot.id);
        assert_eq!(booking.status, BookingStatus::Rescheduled);
        assert_eq!(world.current_booking(), booking);
        assert!(
            world
                .store
                .find_request_by_booking(&world.booking.id)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn reject_restores_pre_submission_state() {
        let world = World::new();
        let engine = engine(&world.store);
        let before = world.current_booking();

        engine.submit(&world.submit_body()).unwrap();
        let decision = engine.decide(&world.decide_body("rejected")).unwrap();

        assert!(matches!(decision, Decision::Rejected { .. }));
        assert_eq!(world.current_booking(), before);
        assert!(world.store.list_requests().unwrap().is_empty());

        // The booking is back in NoRequest and can be rescheduled again
        engine.submit(&world.submit_body()).unwrap();
    }

    #[test]
    fn decide_without_pending_request_is_not_found() {
        let world = World::new();
        let engine = engine(&world.store);

        for action in ["accepted", "rejected"] {
            let result = engine.decide(&world.decide_body(action));
            assert!(matches!(
                result,
                Err(RescheduleError::NotFound(NotFoundKind::PendingRequest(_)))
            ));
        }
        assert_eq!(world.current_booking(), world.booking);
    }

    #[test]
    fn decide_twice_is_not_found() {
        let world = World::new();
        let engine = engine(&world.store);
        engine.submit(&world.submit_body()).unwrap();

        engine.decide(&world.decide_body("accepted")).unwrap();
        let again = engine.decide(&world.decide_body("accepted"));

        assert!(matches!(
            again,
            Err(RescheduleError::NotFound(NotFoundKind::PendingRequest(_)))
        ));
    }

    #[test]
    fn decide_unknown_booking_is_booking_not_found() {
        let world = World::new();
        let mut body = world.decide_body("accepted");
        body.current_booking_id = oid(0xbad);

        assert!(matches!(
            engine(&world.store).decide(&body),
            Err(RescheduleError::NotFound(NotFoundKind::Booking(_)))
        ));
    }

    #[test]
    fn unknown_action_changes_nothing() {
        let world = World::new();
        let engine = engine(&world.store);
        let request = engine.submit(&world.submit_body()).unwrap();

        let result = engine.decide(&world.decide_body("approve"));

        assert!(matches!(result, Err(RescheduleError::InvalidArgument(a)) if a == "approve"));
        assert_eq!(world.current_booking(), world.booking);
        assert_eq!(
            world
                .store
                .find_request_by_booking(&world.booking.id)
                .unwrap(),
            Some(request)
        );
    }

    #[test]
    fn mismatched_echo_is_rejected() {
        let world = World::new();
        let engine = engine(&world.store);
        engine.submit(&world.submit_body()).unwrap();

        let mut body = world.decide_body("accepted");
        body.requested_slot_id = Some(world.booking.slot_id.to_string());

        let err = engine.decide(&body).unwrap_err();
        assert!(matches!(err, RescheduleError::Validation(ref f) if f[0].field == "requestedSlotId"));
        assert_eq!(world.current_booking(), world.booking);
    }

    #[test]
    fn accept_requires_slot_to_belong_to_date() {
        let world = World::new();
        let engine = engine(&world.store);

        // Slot exists but belongs to the booking's current date
        let body = SubmitRescheduleBody {
            current_booking_id: world.booking.id.to_string(),
            requested_date_id: world.new_date.id.to_string(),
            requested_slot_id: world.old_slot_spare.id.to_string(),
        };
        engine.submit(&body).unwrap();

        let mut decide = world.decide_body("accepted");
        decide.requested_date_id = None;
        decide.requested_slot_id = None;
        let err = engine.decide(&decide).unwrap_err();
        assert!(matches!(err, RescheduleError::Validation(_)));
        assert_eq!(world.current_booking(), world.booking);

        // Rejecting is still possible
        engine.decide(&world.decide_body_bare("rejected")).unwrap();
    }

    #[test]
    fn slot_membership_check_can_be_disabled() {
        let world = World::new();
        let engine = RescheduleEngine::new(
            world.store.clone(),
            RescheduleSettings {
                verify_slot_membership: false,
                reconcile_on_startup: false,
            },
        );

        let body = SubmitRescheduleBody {
            current_booking_id: world.booking.id.to_string(),
            requested_date_id: oid(0xdd),
            requested_slot_id: oid(0x5d),
        };
        engine.submit(&body).unwrap();

        let decision = engine.decide(&world.decide_body_bare("accepted")).unwrap();
        assert!(matches!(decision, Decision::Accepted { .. }));
    }

    #[test]
    fn decisions_are_audited() {
        let world = World::new();
        let engine = engine(&world.store);
        engine.submit(&world.submit_body()).unwrap();
        engine.decide(&world.decide_body("accepted")).unwrap();

        let events = world.store.recent_audits(10).unwrap();
        assert!(matches!(
            events[0].event,
            AuditEventType::RescheduleAccepted { .. }
        ));
        assert!(matches!(
            events[1].event,
            AuditEventType::RescheduleSubmitted { .. }
        ));
    }

    #[test]
    fn consistency_failure_is_surfaced_and_audited() {
        let world = World::new();
        let engine = engine(&world.store);
        engine.submit(&world.submit_body()).unwrap();

        let flaky = Arc::new(FaultyStore::new(world.store.clone(), Fault::Inconsistent));
        let flaky_engine = RescheduleEngine::new(flaky, RescheduleSettings::default());

        let err = flaky_engine
            .decide(&world.decide_body("accepted"))
            .unwrap_err();
        assert!(matches!(err, RescheduleError::Consistency { .. }));

        let events = world.store.recent_audits(1).unwrap();
        assert!(matches!(
            events[0].event,
            AuditEventType::ConsistencyFailure { .. }
        ));
    }

    #[test]
    fn reconcile_removes_stale_requests() {
        let world = World::new();
        let engine = engine(&world.store);
        engine.submit(&world.submit_body()).unwrap();

        // Booking moved but request left behind
        let mut moved = world.booking.clone();
        moved.date_id = world.new_date.id.clone();
        moved.slot_id = world.new_slot.id.clone();
        moved.status = BookingStatus::Rescheduled;
        world.store.save_booking(&moved).unwrap();

        let removed = engine.reconcile().unwrap();
        assert_eq!(removed.len(), 1);
        assert!(world.store.list_requests().unwrap().is_empty());

        assert!(engine.reconcile().unwrap().is_empty());
    }
}
