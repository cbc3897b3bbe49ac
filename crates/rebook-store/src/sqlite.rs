//! SQLite-based store implementation

use chrono::{DateTime, NaiveDate, Utc};
use rebook_api::{
    Availability, Booking, BookingStatus, DateEntry, Expert, RescheduleAction, RescheduleRequest,
    Slot,
};
use rebook_util::{BookingId, DateId, ExpertId, PlanId, RequestId, SlotId};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::{
    AuditEvent, AuditLog, AvailabilityStore, BookingStore, ExpertDirectory, RescheduleRepository,
    Store, StoreError, StoreResult,
};

const DAY_FORMAT: &str = "%Y-%m-%d";

const BOOKING_COLUMNS: &str = "id, expert_id, plan_id, guest_name, date_id, slot_id, status";

const REQUEST_COLUMNS: &str =
    "r.id, r.current_booking_id, r.requested_date_id, r.requested_slot_id, r.created_at";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Records owned by the expert/booking services
            CREATE TABLE IF NOT EXISTS experts (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                fullname TEXT NOT NULL,
                expertise TEXT
            );

            CREATE TABLE IF NOT EXISTS dates (
                id TEXT PRIMARY KEY,
                expert_id TEXT NOT NULL,
                day TEXT NOT NULL,
                availability TEXT NOT NULL,
                slot_ids_json TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS slots (
                id TEXT PRIMARY KEY,
                expert_id TEXT NOT NULL,
                plan_id TEXT,
                timing TEXT NOT NULL,
                period TEXT NOT NULL,
                availability TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                expert_id TEXT NOT NULL,
                plan_id TEXT,
                guest_name TEXT NOT NULL DEFAULT '',
                date_id TEXT NOT NULL,
                slot_id TEXT NOT NULL,
                status TEXT NOT NULL
            );

            -- Pending reschedule requests (one per booking)
            CREATE TABLE IF NOT EXISTS reschedule_requests (
                id TEXT PRIMARY KEY,
                current_booking_id TEXT NOT NULL UNIQUE,
                requested_date_id TEXT NOT NULL,
                requested_slot_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_bookings_expert ON bookings(expert_id);
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

/// Read a text column and convert it, reporting conversion failures as
/// column errors
fn column<T, E, F>(row: &Row<'_>, idx: usize, parse: F) -> rusqlite::Result<T>
where
    F: FnOnce(&str) -> Result<T, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_column<T, E, F>(row: &Row<'_>, idx: usize, parse: F) -> rusqlite::Result<Option<T>>
where
    F: FnOnce(&str) -> Result<T, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        parse(&s).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn parse_day(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, DAY_FORMAT)
}

fn parse_created_at(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: column(row, 0, BookingId::parse)?,
        expert_id: column(row, 1, ExpertId::parse)?,
        plan_id: optional_column(row, 2, PlanId::parse)?,
        guest_name: row.get(3)?,
        date_id: column(row, 4, DateId::parse)?,
        slot_id: column(row, 5, SlotId::parse)?,
        status: column(row, 6, str::parse::<BookingStatus>)?,
    })
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<RescheduleRequest> {
    Ok(RescheduleRequest {
        id: column(row, 0, RequestId::parse)?,
        current_booking_id: column(row, 1, BookingId::parse)?,
        requested_date_id: column(row, 2, DateId::parse)?,
        requested_slot_id: column(row, 3, SlotId::parse)?,
        created_at: column(row, 4, parse_created_at)?,
    })
}

fn query_booking(conn: &Connection, id: &BookingId) -> StoreResult<Option<Booking>> {
    let booking = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            [id.as_str()],
            booking_from_row,
        )
        .optional()?;
    Ok(booking)
}

fn query_requests(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> StoreResult<Vec<RescheduleRequest>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, request_from_row)?;

    let mut requests = Vec::new();
    for row in rows {
        requests.push(row?);
    }
    Ok(requests)
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Roll back an accept whose request deletion failed. If even the rollback
/// fails the booking may already carry the new date and slot while the
/// request survives, which is reported as an inconsistency.
fn abort_accept(tx: Transaction<'_>, booking_id: &BookingId, cause: rusqlite::Error) -> StoreError {
    match tx.rollback() {
        Ok(()) => {
            warn!(booking_id = %booking_id, error = %cause, "Request delete failed, accept rolled back");
            StoreError::from(cause)
        }
        Err(rollback_err) => {
            error!(
                booking_id = %booking_id,
                error = %cause,
                rollback_error = %rollback_err,
                "Accept could not be rolled back"
            );
            StoreError::Inconsistent {
                booking_id: booking_id.clone(),
                detail: format!(
                    "request delete failed ({cause}) and rollback failed ({rollback_err})"
                ),
            }
        }
    }
}

impl BookingStore for SqliteStore {
    fn find_booking(&self, id: &BookingId) -> StoreResult<Option<Booking>> {
        let conn = self.conn()?;
        query_booking(&conn, id)
    }

    fn save_booking(&self, booking: &Booking) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO bookings (id, expert_id, plan_id, guest_name, date_id, slot_id, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id)
            DO UPDATE SET
                expert_id = excluded.expert_id,
                plan_id = excluded.plan_id,
                guest_name = excluded.guest_name,
                date_id = excluded.date_id,
                slot_id = excluded.slot_id,
                status = excluded.status
            "#,
            params![
                booking.id.as_str(),
                booking.expert_id.as_str(),
                booking.plan_id.as_ref().map(|p| p.as_str()),
                booking.guest_name,
                booking.date_id.as_str(),
                booking.slot_id.as_str(),
                booking.status.as_str(),
            ],
        )?;

        debug!(booking_id = %booking.id, status = %booking.status, "Booking saved");
        Ok(())
    }
}

impl AvailabilityStore for SqliteStore {
    fn find_date(&self, id: &DateId) -> StoreResult<Option<DateEntry>> {
        let conn = self.conn()?;

        let date = conn
            .query_row(
                "SELECT id, expert_id, day, availability, slot_ids_json FROM dates WHERE id = ?1",
                [id.as_str()],
                |row| {
                    Ok(DateEntry {
                        id: column(row, 0, DateId::parse)?,
                        expert_id: column(row, 1, ExpertId::parse)?,
                        date: column(row, 2, parse_day)?,
                        availability: column(row, 3, str::parse::<Availability>)?,
                        slot_ids: column(row, 4, |s: &str| serde_json::from_str::<Vec<SlotId>>(s))?,
                    })
                },
            )
            .optional()?;

        Ok(date)
    }

    fn find_slot(&self, id: &SlotId) -> StoreResult<Option<Slot>> {
        let conn = self.conn()?;

        let slot = conn
            .query_row(
                "SELECT id, expert_id, plan_id, timing, period, availability FROM slots WHERE id = ?1",
                [id.as_str()],
                |row| {
                    Ok(Slot {
                        id: column(row, 0, SlotId::parse)?,
                        expert_id: column(row, 1, ExpertId::parse)?,
                        plan_id: optional_column(row, 2, PlanId::parse)?,
                        timing: row.get(3)?,
                        period: row.get(4)?,
                        availability: column(row, 5, str::parse::<Availability>)?,
                    })
                },
            )
            .optional()?;

        Ok(slot)
    }

    fn save_date(&self, date: &DateEntry) -> StoreResult<()> {
        let conn = self.conn()?;
        let slot_ids_json = serde_json::to_string(&date.slot_ids)?;

        conn.execute(
            r#"
            INSERT INTO dates (id, expert_id, day, availability, slot_ids_json)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id)
            DO UPDATE SET
                expert_id = excluded.expert_id,
                day = excluded.day,
                availability = excluded.availability,
                slot_ids_json = excluded.slot_ids_json
            "#,
            params![
                date.id.as_str(),
                date.expert_id.as_str(),
                date.date.format(DAY_FORMAT).to_string(),
                date.availability.as_str(),
                slot_ids_json,
            ],
        )?;

        debug!(date_id = %date.id, slots = date.slot_ids.len(), "Date saved");
        Ok(())
    }

    fn save_slot(&self, slot: &Slot) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO slots (id, expert_id, plan_id, timing, period, availability)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id)
            DO UPDATE SET
                expert_id = excluded.expert_id,
                plan_id = excluded.plan_id,
                timing = excluded.timing,
                period = excluded.period,
                availability = excluded.availability
            "#,
            params![
                slot.id.as_str(),
                slot.expert_id.as_str(),
                slot.plan_id.as_ref().map(|p| p.as_str()),
                slot.timing,
                slot.period,
                slot.availability.as_str(),
            ],
        )?;

        debug!(slot_id = %slot.id, "Slot saved");
        Ok(())
    }
}

impl ExpertDirectory for SqliteStore {
    fn find_expert(&self, id: &ExpertId) -> StoreResult<Option<Expert>> {
        let conn = self.conn()?;

        let expert = conn
            .query_row(
                "SELECT id, username, fullname, expertise FROM experts WHERE id = ?1",
                [id.as_str()],
                |row| {
                    Ok(Expert {
                        id: column(row, 0, ExpertId::parse)?,
                        username: row.get(1)?,
                        fullname: row.get(2)?,
                        expertise: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(expert)
    }

    fn save_expert(&self, expert: &Expert) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO experts (id, username, fullname, expertise)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id)
            DO UPDATE SET
                username = excluded.username,
                fullname = excluded.fullname,
                expertise = excluded.expertise
            "#,
            params![
                expert.id.as_str(),
                expert.username,
                expert.fullname,
                expert.expertise,
            ],
        )?;

        debug!(expert_id = %expert.id, "Expert saved");
        Ok(())
    }
}

impl RescheduleRepository for SqliteStore {
    fn create_request(
        &self,
        booking_id: &BookingId,
        date_id: &DateId,
        slot_id: &SlotId,
    ) -> StoreResult<RescheduleRequest> {
        let request = RescheduleRequest {
            id: RequestId::generate(),
            current_booking_id: booking_id.clone(),
            requested_date_id: date_id.clone(),
            requested_slot_id: slot_id.clone(),
            created_at: rebook_util::now(),
        };

        let conn = self.conn()?;
        let inserted = conn.execute(
            r#"
            INSERT INTO reschedule_requests
                (id, current_booking_id, requested_date_id, requested_slot_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                request.id.as_str(),
                booking_id.as_str(),
                date_id.as_str(),
                slot_id.as_str(),
                rebook_util::format_timestamp(&request.created_at),
            ],
        );

        match inserted {
            Ok(_) => {
                debug!(request_id = %request.id, booking_id = %booking_id, "Reschedule request stored");
                Ok(request)
            }
            Err(e) if is_constraint_violation(&e) => Err(StoreError::Conflict(format!(
                "booking {booking_id} already has a pending reschedule request"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn list_requests(&self) -> StoreResult<Vec<RescheduleRequest>> {
        let conn = self.conn()?;
        query_requests(
            &conn,
            &format!("SELECT {REQUEST_COLUMNS} FROM reschedule_requests r ORDER BY r.rowid"),
            [],
        )
    }

    fn list_requests_for_expert(&self, expert_id: &ExpertId) -> StoreResult<Vec<RescheduleRequest>> {
        let conn = self.conn()?;
        query_requests(
            &conn,
            &format!(
                r#"
                SELECT {REQUEST_COLUMNS}
                FROM reschedule_requests r
                JOIN bookings b ON b.id = r.current_booking_id
                WHERE b.expert_id = ?1
                ORDER BY r.rowid
                "#
            ),
            [expert_id.as_str()],
        )
    }

    fn find_request_by_booking(&self, booking_id: &BookingId) -> StoreResult<Option<RescheduleRequest>> {
        let conn = self.conn()?;

        let request = conn
            .query_row(
                &format!(
                    "SELECT {REQUEST_COLUMNS} FROM reschedule_requests r WHERE r.current_booking_id = ?1"
                ),
                [booking_id.as_str()],
                request_from_row,
            )
            .optional()?;

        Ok(request)
    }

    fn delete_request_by_booking(&self, booking_id: &BookingId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM reschedule_requests WHERE current_booking_id = ?1",
            [booking_id.as_str()],
        )?;
        Ok(deleted > 0)
    }

    fn resolve_request(
        &self,
        request: &RescheduleRequest,
        action: RescheduleAction,
    ) -> StoreResult<Option<Booking>> {
        let booking_id = &request.current_booking_id;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if action == RescheduleAction::Accepted {
            let updated = tx.execute(
                r#"
                UPDATE bookings SET date_id = ?1, slot_id = ?2, status = ?3
                WHERE id = ?4 AND status NOT IN (?5, ?6)
                "#,
                params![
                    request.requested_date_id.as_str(),
                    request.requested_slot_id.as_str(),
                    BookingStatus::Rescheduled.as_str(),
                    booking_id.as_str(),
                    BookingStatus::Cancelled.as_str(),
                    BookingStatus::Completed.as_str(),
                ],
            )?;
            if updated == 0 {
                // Dropping the transaction rolls it back
                return Err(match query_booking(&tx, booking_id)? {
                    Some(booking) => StoreError::Conflict(format!(
                        "booking {booking_id} is {} and cannot be rescheduled",
                        booking.status
                    )),
                    None => StoreError::not_found("booking", booking_id),
                });
            }
        }

        let deleted = match tx.execute(
            "DELETE FROM reschedule_requests WHERE id = ?1 AND current_booking_id = ?2",
            params![request.id.as_str(), booking_id.as_str()],
        ) {
            Ok(n) => n,
            Err(e) if action == RescheduleAction::Accepted => {
                return Err(abort_accept(tx, booking_id, e));
            }
            Err(e) => return Err(e.into()),
        };

        if deleted == 0 {
            tx.rollback()?;
            return Err(StoreError::not_found("reschedule request", booking_id));
        }

        let booking = match action {
            RescheduleAction::Accepted => query_booking(&tx, booking_id)?,
            RescheduleAction::Rejected => None,
        };

        tx.commit()?;

        debug!(
            request_id = %request.id,
            booking_id = %booking_id,
            action = action.as_str(),
            "Reschedule request resolved"
        );
        Ok(booking)
    }

    fn delete_stale_requests(&self) -> StoreResult<Vec<RescheduleRequest>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let stale = query_requests(
            &tx,
            &format!(
                r#"
                SELECT {REQUEST_COLUMNS}
                FROM reschedule_requests r
                JOIN bookings b ON b.id = r.current_booking_id
                WHERE b.status = ?1
                  AND b.date_id = r.requested_date_id
                  AND b.slot_id = r.requested_slot_id
                ORDER BY r.rowid
                "#
            ),
            [BookingStatus::Rescheduled.as_str()],
        )?;

        for request in &stale {
            tx.execute(
                "DELETE FROM reschedule_requests WHERE id = ?1",
                [request.id.as_str()],
            )?;
        }

        tx.commit()?;

        if !stale.is_empty() {
            info!(count = stale.len(), "Stale reschedule requests removed");
        }
        Ok(stale)
    }
}

impl AuditLog for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?1, ?2)",
            params![rebook_util::format_timestamp(&event.timestamp), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp =
                rebook_util::parse_timestamp(&timestamp_str).unwrap_or_else(rebook_util::now);
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }
}

impl Store for SqliteStore {
    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
