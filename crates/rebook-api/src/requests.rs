//! Request bodies accepted by the HTTP service
//!
//! Identifier fields are kept as raw strings here. Missing fields default to
//! empty so the engine can report every bad field at once instead of failing
//! on the first absent key.

use serde::{Deserialize, Serialize};

/// Body of `POST /reschedule`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRescheduleBody {
    #[serde(default)]
    pub current_booking_id: String,
    #[serde(default)]
    pub requested_date_id: String,
    #[serde(default)]
    pub requested_slot_id: String,
}

/// Body of `POST /handle-Reschedule`
///
/// The requested ids are optional echoes of the pending request; when sent
/// they must match it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideRescheduleBody {
    #[serde(default)]
    pub current_booking_id: String,
    #[serde(default)]
    pub requested_date_id: Option<String>,
    #[serde(default)]
    pub requested_slot_id: Option<String>,
    #[serde(default)]
    pub action: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_body_reads_camel_case() {
        let body: SubmitRescheduleBody = serde_json::from_str(
            r#"{"currentBookingId":"a","requestedDateId":"b","requestedSlotId":"c"}"#,
        )
        .unwrap();
        assert_eq!(body.current_booking_id, "a");
        assert_eq!(body.requested_date_id, "b");
        assert_eq!(body.requested_slot_id, "c");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let body: DecideRescheduleBody = serde_json::from_str(r#"{"action":"accepted"}"#).unwrap();
        assert!(body.current_booking_id.is_empty());
        assert!(body.requested_date_id.is_none());
        assert_eq!(body.action, "accepted");
    }
}
