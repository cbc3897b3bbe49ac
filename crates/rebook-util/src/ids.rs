//! Strongly-typed record identifiers for rebook
//!
//! Every record in the booking system is keyed by a 24 character hex object
//! id. The wrappers below keep booking, date, slot and expert ids from being
//! mixed up, and refuse malformed values at the edge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::IdError;

/// Length of a textual object id
pub const OBJECT_ID_LEN: usize = 24;

/// Check whether `value` is a syntactically valid object id
pub fn is_object_id(value: &str) -> bool {
    value.len() == OBJECT_ID_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_object_id(kind: &'static str, value: &str) -> Result<String, IdError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty { kind });
    }
    if !is_object_id(trimmed) {
        return Err(IdError::Malformed {
            kind,
            value: value.to_string(),
        });
    }
    Ok(trimmed.to_ascii_lowercase())
}

fn generate_object_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(OBJECT_ID_LEN);
    id
}

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random id
            pub fn generate() -> Self {
                Self(generate_object_id())
            }

            /// Parse and normalize an id, rejecting malformed input
            pub fn parse(value: &str) -> Result<Self, IdError> {
                parse_object_id($kind, value).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

object_id!(
    /// Identifier of a guest booking
    BookingId,
    "booking"
);

object_id!(
    /// Identifier of a calendar date entry
    DateId,
    "date"
);

object_id!(
    /// Identifier of a bookable slot within a date
    SlotId,
    "slot"
);

object_id!(
    /// Identifier of an expert
    ExpertId,
    "expert"
);

object_id!(
    /// Identifier of an expert's plan
    PlanId,
    "plan"
);

object_id!(
    /// Identifier of a reschedule request
    RequestId,
    "request"
);
