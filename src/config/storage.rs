//! Storage configuration types.

use std::time::Duration;

use serde::Deserialize;

use crate::coordinator::StoreTimeouts;

/// Primary store type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryType {
    Postgres,
    #[default]
    Sqlite,
}

/// Secondary store type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondaryType {
    /// Cloud Spanner through its PostgreSQL interface (PGAdapter).
    Spanner,
    #[default]
    Sqlite,
}

/// Storage configuration for both roles.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub primary: PrimaryConfig,
    pub secondary: SecondaryConfig,
    pub timeouts: TimeoutsConfig,
}

impl StorageConfig {
    /// Both stores as private in-memory SQLite databases.
    pub fn in_memory() -> Self {
        Self {
            primary: PrimaryConfig {
                uri: "sqlite::memory:".to_string(),
                ..PrimaryConfig::default()
            },
            secondary: SecondaryConfig {
                uri: "sqlite::memory:".to_string(),
                ..SecondaryConfig::default()
            },
            timeouts: TimeoutsConfig::default(),
        }
    }
}

/// Primary store connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: PrimaryType,
    /// Connection URI (`postgres://...` or `sqlite:...`).
    pub uri: String,
    /// Pool size.
    pub max_connections: u32,
    /// Create the sales table on startup if it is missing.
    pub init_schema: bool,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            storage_type: PrimaryType::Sqlite,
            uri: "sqlite://data/primary.db?mode=rwc".to_string(),
            max_connections: 5,
            init_schema: true,
        }
    }
}

/// Secondary store connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecondaryConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: SecondaryType,
    /// Connection URI. For Spanner, the PGAdapter endpoint
    /// (e.g. `postgres://localhost:5432/sales-db`).
    pub uri: String,
    /// Pool size.
    pub max_connections: u32,
    /// Create the sales table on startup if it is missing.
    pub init_schema: bool,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            storage_type: SecondaryType::Sqlite,
            uri: "sqlite://data/secondary.db?mode=rwc".to_string(),
            max_connections: 5,
            init_schema: true,
        }
    }
}

/// Timeouts, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Bound on each primary call (begin, write, commit, rollback, read).
    pub primary_ms: u64,
    /// Bound on each secondary call.
    pub secondary_ms: u64,
    /// Bound on acquiring a pooled connection, and on each startup connection attempt.
    pub connect_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            primary_ms: 5_000,
            secondary_ms: 5_000,
            connect_ms: 10_000,
        }
    }
}

impl TimeoutsConfig {
    pub fn store_timeouts(&self) -> StoreTimeouts {
        StoreTimeouts {
            primary: Duration::from_millis(self.primary_ms),
            secondary: Duration::from_millis(self.secondary_ms),
        }
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }
}
