use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::sync::LockPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Ledger configuration, usually read from a TOML file. Missing keys fall
/// back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Bank name
    pub name: String,

    /// Branch code
    pub branch_code: String,

    /// Per-account lock acquisition used by the concurrent layer
    pub lock: LockConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            name: "Branch Ledger".to_string(),
            branch_code: "BR-001".to_string(),
            lock: LockConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Bounded wait for a single lock attempt, in milliseconds
    pub timeout_ms: u64,

    /// Attempts before a transfer gives up
    pub retries: u32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 50,
            retries: 3,
        }
    }
}

impl LockConfig {
    pub fn policy(&self) -> LockPolicy {
        LockPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            retries: self.retries,
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}
