//! Validated settings structures

use crate::schema::{RawConfig, RawRescheduleConfig, RawServerConfig};
use crate::validation::parse_listen;
use rebook_util::{DATABASE_FILENAME, default_data_dir};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;

/// Default HTTP listen address
pub const DEFAULT_LISTEN: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8080));

/// Validated settings ready for use by the service
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub reschedule: RescheduleSettings,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            server: ServerConfig::from_raw(raw.server),
            reschedule: RescheduleSettings::from_raw(raw.reschedule),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::from_raw(RawServerConfig::default()),
            reschedule: RescheduleSettings::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub data_dir: PathBuf,
}

impl ServerConfig {
    fn from_raw(raw: RawServerConfig) -> Self {
        Self {
            // Validation has already rejected unparseable addresses
            listen: raw
                .listen
                .as_deref()
                .and_then(|s| parse_listen(s).ok())
                .unwrap_or(DEFAULT_LISTEN),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
        }
    }

    /// Location of the SQLite database inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILENAME)
    }
}

/// Reschedule workflow toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescheduleSettings {
    /// On accept, require the requested date and slot to exist and belong together
    pub verify_slot_membership: bool,

    /// Clean up stale requests at startup
    pub reconcile_on_startup: bool,
}

impl RescheduleSettings {
    fn from_raw(raw: RawRescheduleConfig) -> Self {
        let defaults = Self::default();
        Self {
            verify_slot_membership: raw
                .verify_slot_membership
                .unwrap_or(defaults.verify_slot_membership),
            reconcile_on_startup: raw
                .reconcile_on_startup
                .unwrap_or(defaults.reconcile_on_startup),
        }
    }
}

impl Default for RescheduleSettings {
    fn default() -> Self {
        Self {
            verify_slot_membership: true,
            reconcile_on_startup: true,
        }
    }
}
