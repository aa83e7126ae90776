//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `score_changes_total{outcome}` - Score change attempts by outcome
//!   (`applied`, `rejected`, `failed`)
//! - `participants_registered_total` - Registered participants
//! - `store_retries_total` - Retries of transient store failures

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Score change attempts by outcome
    pub score_changes: IntCounterVec,

    /// Registered participants
    pub participants_registered: IntCounter,

    /// Retries of transient store failures
    pub store_retries: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("participants_registered", &self.participants_registered.get())
            .field("store_retries", &self.store_retries.get())
            .finish()
    }
}

impl Metrics {
    /// Create a collector on its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let score_changes = IntCounterVec::new(
            Opts::new("score_changes_total", "Score change attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(score_changes.clone()))?;

        let participants_registered = IntCounter::new(
            "participants_registered_total",
            "Total number of registered participants",
        )?;
        registry.register(Box::new(participants_registered.clone()))?;

        let store_retries = IntCounter::new(
            "store_retries_total",
            "Retries of transient store failures",
        )?;
        registry.register(Box::new(store_retries.clone()))?;

        Ok(Self {
            score_changes,
            participants_registered,
            store_retries,
            registry,
        })
    }

    /// Accepted score change
    pub fn record_applied(&self) {
        self.score_changes.with_label_values(&["applied"]).inc();
    }

    /// Score change rejected by a domain rule
    pub fn record_rejected(&self) {
        self.score_changes.with_label_values(&["rejected"]).inc();
    }

    /// Score change that failed in the store
    pub fn record_failed(&self) {
        self.score_changes.with_label_values(&["failed"]).inc();
    }

    /// New participant
    pub fn record_registration(&self) {
        self.participants_registered.inc();
    }

    /// Render in the Prometheus text exposition format
    pub fn gather_text(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
