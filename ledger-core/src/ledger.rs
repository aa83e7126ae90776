//! Main ledger orchestration layer
//!
//! Opens the store once and wires the engine and query service to the same
//! handle, metrics registry and retry policy.
//!
//! # Example
//!
//! ```no_run
//! use scoreboard_ledger::{Ledger, LedgerConfig};
//!
//! #[tokio::main]
//! async fn main() -> scoreboard_ledger::Result<()> {
//!     let ledger = Ledger::open(LedgerConfig::default()).await?;
//!
//!     let alice = ledger.queries().register_participant("Alice").await?;
//!     let change = ledger.engine().apply_score_change(alice.id, 30).await?;
//!     assert_eq!(change.new_score, 30);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    engine::LedgerEngine,
    identity::{IdentityEncoder, QrPngEncoder},
    metrics::Metrics,
    query::QueryService,
    retry::RetryPolicy,
    storage::{SqliteStore, Store},
    LedgerConfig, Result,
};
use std::sync::Arc;
use tracing::info;

/// Main ledger interface
pub struct Ledger {
    store: Arc<dyn Store>,
    engine: LedgerEngine,
    queries: QueryService,
    metrics: Metrics,
}

impl Ledger {
    /// Open the configured SQLite store, create the schema and wire components
    pub async fn open(config: LedgerConfig) -> Result<Self> {
        config.validate()?;

        let store = SqliteStore::connect_and_migrate(&config.store).await?;
        info!(url = %config.store.url, "Store opened");

        let encoder = QrPngEncoder::new(config.identity.module_size);
        Self::with_components(Arc::new(store), Arc::new(encoder), &config)
    }

    /// Wire components around an already opened store
    pub fn with_components(
        store: Arc<dyn Store>,
        encoder: Arc<dyn IdentityEncoder>,
        config: &LedgerConfig,
    ) -> Result<Self> {
        let metrics = Metrics::new()?;
        let retry =
            RetryPolicy::new(config.retry.clone()).with_counter(metrics.store_retries.clone());

        Ok(Self {
            engine: LedgerEngine::new(store.clone(), retry.clone(), metrics.clone()),
            queries: QueryService::new(store.clone(), encoder, retry, metrics.clone()),
            metrics,
            store,
        })
    }

    /// Score-changing operations
    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// Read operations and registration
    pub fn queries(&self) -> &QueryService {
        &self.queries
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Release the store; operations fail afterwards
    pub async fn close(&self) {
        self.store.close().await;
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("engine", &self.engine)
            .field("queries", &self.queries)
            .field("metrics", &self.metrics)
            .finish()
    }
}
