//! Fixture import for the records other services own
//!
//! Experts, dates, slots and bookings are created by their own CRUD
//! services. A fixture file lets a standalone deployment (or a demo) seed
//! them into the shared store.

use rebook_api::{Booking, DateEntry, Expert, Slot};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::{AuditEvent, AuditEventType, Store, StoreResult};

/// Contents of a fixture file (JSON)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub experts: Vec<Expert>,
    #[serde(default)]
    pub dates: Vec<DateEntry>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

impl Fixtures {
    /// Read fixtures from a JSON file
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Upsert every record into the store
    pub fn import(&self, store: &dyn Store) -> StoreResult<()> {
        for expert in &self.experts {
            store.save_expert(expert)?;
        }
        for slot in &self.slots {
            store.save_slot(slot)?;
        }
        for date in &self.dates {
            store.save_date(date)?;
        }
        for booking in &self.bookings {
            store.save_booking(booking)?;
        }

        store.append_audit(AuditEvent::new(AuditEventType::FixturesImported {
            experts: self.experts.len(),
            dates: self.dates.len(),
            slots: self.slots.len(),
            bookings: self.bookings.len(),
        }))?;

        info!(
            experts = self.experts.len(),
            dates = self.dates.len(),
            slots = self.slots.len(),
            bookings = self.bookings.len(),
            "Fixtures imported"
        );
        Ok(())
    }
}
