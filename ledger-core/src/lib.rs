//! Scoreboard Ledger Core
//!
//! Participants, their non-negative scores, and the append-only transaction
//! history backing those scores.
//!
//! # Architecture
//!
//! - **Store**: SQLite tables for participants, transactions and sessions
//! - **Ledger Engine**: sole writer of scores; validates and commits atomically
//! - **Query Service**: read projections, registration, identity lookup
//! - **Identity Encoder**: payload → QR code PNG
//!
//! # Invariants
//!
//! - Σ(transaction deltas of p) == score(p) after every commit
//! - score(p) >= 0 at all times
//! - Writes to one participant are totally ordered

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod metrics;
pub mod query;
pub mod retry;
pub mod storage;
pub mod types;

// Re-exports
pub use config::{IdentityConfig, LedgerConfig, StoreConfig};
pub use engine::{validate_score_change, LedgerEngine};
pub use error::{Error, ErrorKind, Result};
pub use identity::{IdentityEncoder, QrPngEncoder};
pub use ledger::Ledger;
pub use metrics::Metrics;
pub use query::QueryService;
pub use retry::{RetryConfig, RetryPolicy};
pub use storage::{CommitOutcome, SqliteStore, Store};
pub use types::{
    IdentityImage, IdentityPayload, Participant, ParticipantId, ScoreChange, ScoreTransaction,
    Session,
};
