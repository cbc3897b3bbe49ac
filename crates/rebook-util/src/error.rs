//! Error types for record identifiers

use thiserror::Error;

/// Raised when a string is not a well-formed record identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{kind} id must not be empty")]
    Empty { kind: &'static str },

    #[error("'{value}' is not a valid {kind} id (expected 24 hex characters)")]
    Malformed { kind: &'static str, value: String },
}

impl IdError {
    /// The kind of record the identifier was meant for ("booking", "slot", ...)
    pub fn kind(&self) -> &'static str {
        match self {
            IdError::Empty { kind } | IdError::Malformed { kind, .. } => kind,
        }
    }
}
