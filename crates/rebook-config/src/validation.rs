//! Configuration validation

use crate::schema::RawConfig;
use std::net::SocketAddr;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid listen address '{value}': {message}")]
    InvalidListenAddress { value: String, message: String },

    #[error("server.data_dir cannot be empty")]
    EmptyDataDir,
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(listen) = &config.server.listen
        && let Err(e) = parse_listen(listen)
    {
        errors.push(ValidationError::InvalidListenAddress {
            value: listen.clone(),
            message: e,
        });
    }

    if let Some(dir) = &config.server.data_dir
        && dir.as_os_str().is_empty()
    {
        errors.push(ValidationError::EmptyDataDir);
    }

    errors
}

/// Parse a `host:port` listen address
pub fn parse_listen(s: &str) -> Result<SocketAddr, String> {
    s.trim()
        .parse::<SocketAddr>()
        .map_err(|e| format!("expected host:port ({})", e))
}
