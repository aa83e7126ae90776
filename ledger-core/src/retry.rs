//! Bounded retry for transient store failures
//!
//! Exponential backoff with jitter. Only errors for which
//! [`Error::is_retryable`](crate::Error::is_retryable) holds are retried; every
//! other error is returned from the first attempt that produced it.

use crate::{Error, Result};
use prometheus::IntCounter;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds)
    pub initial_delay_ms: u64,

    /// Upper bound on any single delay (milliseconds)
    pub max_delay_ms: u64,

    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,

    /// Fraction of the delay randomized in both directions
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 10,
            max_delay_ms: 500,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Reject nonsensical backoff parameters
    pub fn validate(&self) -> Result<()> {
        if self.backoff_multiplier < 1.0 {
            return Err(Error::Config(
                "Retry backoff multiplier must be at least 1.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(Error::Config(
                "Retry jitter factor must be within [0, 1]".to_string(),
            ));
        }

        if self.initial_delay_ms > self.max_delay_ms {
            return Err(Error::Config(
                "Initial retry delay exceeds the maximum delay".to_string(),
            ));
        }

        Ok(())
    }
}

/// Executes an operation until it succeeds or fails permanently
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    retries: Option<IntCounter>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish()
    }
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            retries: None,
        }
    }

    /// Policy with default settings
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Count every retry on `counter`
    pub fn with_counter(mut self, counter: IntCounter) -> Self {
        self.retries = Some(counter);
        self
    }

    /// Delay before retry number `attempt` (zero-based)
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);

        let capped_delay = base_delay.min(self.config.max_delay_ms as f64);

        let jitter_range = capped_delay * self.config.jitter_factor;
        let jitter = (rand::random::<f64>() - 0.5) * jitter_range * 2.0;
        let final_delay = (capped_delay + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }

    /// Run `operation`, retrying transient failures
    ///
    /// Each attempt calls `operation` afresh, so any validation it performs is
    /// re-evaluated against current state.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempt, "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.calculate_delay(attempt);
                    attempt += 1;
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    if let Some(counter) = &self.retries {
                        counter.inc();
                    }
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            error = %e,
                            "Retries exhausted"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}
