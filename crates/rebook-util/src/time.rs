//! Wall-clock helpers
//!
//! All persisted timestamps are UTC and stored as RFC 3339 strings.

use chrono::{DateTime, Utc};

/// Current wall-clock time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp the way the store persists it
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse a persisted timestamp, tolerating garbage by returning `None`
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(value, error = %e, "Unparseable timestamp");
            None
        }
    }
}
