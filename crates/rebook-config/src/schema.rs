//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// HTTP server settings
    #[serde(default)]
    pub server: RawServerConfig,

    /// Reschedule workflow settings
    #[serde(default)]
    pub reschedule: RawRescheduleConfig,
}

/// Server-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServerConfig {
    /// Listen address (default: 127.0.0.1:8080)
    pub listen: Option<String>,

    /// Data directory holding the SQLite database
    pub data_dir: Option<PathBuf>,
}

/// Workflow toggles
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRescheduleConfig {
    /// Require the requested slot to belong to the requested date on accept
    pub verify_slot_membership: Option<bool>,

    /// Drop requests left behind by a half-applied accept when the service starts
    pub reconcile_on_startup: Option<bool>,
}
