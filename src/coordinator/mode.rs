//! Store mode: which store(s) a call touches.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which store(s) a read or write targets.
///
/// Passed explicitly on every coordinator call; there is no process-wide
/// "current database".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// Primary store only. Also accepted as `postgres`.
    #[serde(alias = "postgres")]
    Primary,
    /// Secondary store only; it assigns ids itself. Also accepted as `spanner`.
    #[serde(alias = "spanner")]
    Secondary,
    /// Primary then secondary, rolled back together on failure.
    #[default]
    Dual,
}

impl StoreMode {
    /// Reads go to the secondary only when it is the sole store in play.
    pub fn reads_secondary(self) -> bool {
        self == StoreMode::Secondary
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StoreMode::Primary => "primary",
            StoreMode::Secondary => "secondary",
            StoreMode::Dual => "dual",
        }
    }
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mode string that names no known mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown store mode {0:?} (expected primary, secondary, dual, postgres or spanner)")]
pub struct UnknownStoreMode(pub String);

impl FromStr for StoreMode {
    type Err = UnknownStoreMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "postgres" => Ok(StoreMode::Primary),
            "secondary" | "spanner" => Ok(StoreMode::Secondary),
            "dual" => Ok(StoreMode::Dual),
            _ => Err(UnknownStoreMode(s.to_string())),
        }
    }
}
