//! Shared record types for rebook

use chrono::{DateTime, NaiveDate, Utc};
use rebook_util::{BookingId, DateId, ExpertId, PlanId, RequestId, SlotId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rescheduled,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Rescheduled => "RESCHEDULED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    /// Whether a booking in this status may still be moved
    pub fn is_reschedulable(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown textual value for one of the closed enums
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what} '{value}'")]
pub struct UnknownVariant {
    pub what: &'static str,
    pub value: String,
}

impl FromStr for BookingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "RESCHEDULED" => Ok(BookingStatus::Rescheduled),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "COMPLETED" => Ok(BookingStatus::Completed),
            other => Err(UnknownVariant {
                what: "booking status",
                value: other.to_string(),
            }),
        }
    }
}

/// Availability tag carried by dates and slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    #[serde(rename = "holiday")]
    Holiday,
    #[serde(rename = "available")]
    Available,
    #[serde(rename = "not available")]
    NotAvailable,
    #[serde(rename = "booked")]
    Booked,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Holiday => "holiday",
            Availability::Available => "available",
            Availability::NotAvailable => "not available",
            Availability::Booked => "booked",
        }
    }
}

impl FromStr for Availability {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "holiday" => Ok(Availability::Holiday),
            "available" => Ok(Availability::Available),
            "not available" => Ok(Availability::NotAvailable),
            "booked" => Ok(Availability::Booked),
            other => Err(UnknownVariant {
                what: "availability",
                value: other.to_string(),
            }),
        }
    }
}

/// A guest's appointment against an expert's date and slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub expert_id: ExpertId,
    #[serde(default)]
    pub plan_id: Option<PlanId>,
    #[serde(default)]
    pub guest_name: String,
    pub date_id: DateId,
    pub slot_id: SlotId,
    pub status: BookingStatus,
}

/// A calendar day in an expert's availability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateEntry {
    pub id: DateId,
    pub expert_id: ExpertId,
    pub date: NaiveDate,
    pub availability: Availability,
    #[serde(default)]
    pub slot_ids: Vec<SlotId>,
}

impl DateEntry {
    pub fn owns_slot(&self, slot_id: &SlotId) -> bool {
        self.slot_ids.iter().any(|s| s == slot_id)
    }
}

/// A bookable time unit within a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: SlotId,
    pub expert_id: ExpertId,
    #[serde(default)]
    pub plan_id: Option<PlanId>,
    /// Start time as entered by the expert, e.g. "10:30"
    pub timing: String,
    /// "AM"/"PM" or a free-form duration label
    pub period: String,
    pub availability: Availability,
}

/// Expert display record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expert {
    pub id: ExpertId,
    pub username: String,
    pub fullname: String,
    #[serde(default)]
    pub expertise: Option<String>,
}

/// A pending proposal to move a booking to another date and slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub id: RequestId,
    pub current_booking_id: BookingId,
    pub requested_date_id: DateId,
    pub requested_slot_id: SlotId,
    pub created_at: DateTime<Utc>,
}

/// Decision applied to a pending reschedule request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RescheduleAction {
    Accepted,
    Rejected,
}

impl RescheduleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RescheduleAction::Accepted => "accepted",
            RescheduleAction::Rejected => "rejected",
        }
    }
}

impl FromStr for RescheduleAction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(RescheduleAction::Accepted),
            "rejected" => Ok(RescheduleAction::Rejected),
            other => Err(UnknownVariant {
                what: "action",
                value: other.to_string(),
            }),
        }
    }
}

/// Reschedule request annotated with the owning expert's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertRequestView {
    #[serde(flatten)]
    pub request: RescheduleRequest,
    pub expert_id: ExpertId,
    pub expert_name: String,
}

/// Date projection attached to admin views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateView {
    pub id: DateId,
    pub date: NaiveDate,
    pub availability: Availability,
}

impl From<&DateEntry> for DateView {
    fn from(entry: &DateEntry) -> Self {
        Self {
            id: entry.id.clone(),
            date: entry.date,
            availability: entry.availability,
        }
    }
}

/// Slot projection attached to admin views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub id: SlotId,
    pub timing: String,
    pub period: String,
    pub availability: Availability,
}

impl From<&Slot> for SlotView {
    fn from(slot: &Slot) -> Self {
        Self {
            id: slot.id.clone(),
            timing: slot.timing.clone(),
            period: slot.period.clone(),
            availability: slot.availability,
        }
    }
}

/// Fully enriched request for the admin list.
///
/// Every enrichment is optional: a deleted booking, expert, date or slot
/// leaves its field empty instead of dropping the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRequestView {
    #[serde(flatten)]
    pub request: RescheduleRequest,
    pub expert_name: Option<String>,
    pub booking_status: Option<BookingStatus>,
    pub requested_date: Option<DateView>,
    pub requested_slot: Option<SlotView>,
}
