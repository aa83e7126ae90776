//! Configuration for the ledger core

use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Store connection settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Retry policy for transient store failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Identity code rendering
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite connection URL
    pub url: String,

    /// Pool size
    pub max_connections: u32,

    /// Pool acquire timeout (seconds)
    pub acquire_timeout_secs: u64,

    /// How long a writer waits on a locked database (milliseconds)
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://scoreboard.db".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Identity code rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Edge length of one QR module in pixels
    pub module_size: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { module_size: 10 }
    }
}

impl LedgerConfig {
    /// Reject settings the store or engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.store.url.is_empty() {
            return Err(crate::Error::Config("Database URL is required".to_string()));
        }

        if self.store.max_connections == 0 {
            return Err(crate::Error::Config(
                "Database pool needs at least one connection".to_string(),
            ));
        }

        if self.identity.module_size == 0 {
            return Err(crate::Error::Config("QR module size cannot be 0".to_string()));
        }

        self.retry.validate()
    }
}
