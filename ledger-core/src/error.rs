//! Error types for the scored ledger

use crate::types::ParticipantId;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced participant does not exist
    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// Debit larger than the current balance
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Absolute value of the rejected debit
        requested: u64,
        /// Score at the time of the attempt
        available: i64,
    },

    /// Request violates a domain rule
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Participant row changed between read and commit
    #[error("Concurrent update conflict on participant {0}")]
    Conflict(ParticipantId),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Identity image could not be produced
    #[error("Identity encoding error: {0}")]
    Encoding(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Coarse classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced record is absent
    NotFound,
    /// Caller must correct the input
    InvalidOperation,
    /// Store unavailable or commit conflict; safe to retry
    Transient,
    /// Anything else
    Internal,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ParticipantNotFound(_) => ErrorKind::NotFound,
            Error::InsufficientBalance { .. } | Error::InvalidOperation(_) => {
                ErrorKind::InvalidOperation
            }
            Error::Conflict(_) => ErrorKind::Transient,
            Error::Database(e) if is_transient_db_error(e) => ErrorKind::Transient,
            Error::Database(_) | Error::Encoding(_) | Error::Config(_) | Error::Metrics(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the failed operation may be attempted again unchanged
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// SQLITE_BUSY and SQLITE_LOCKED (primary codes, extended codes share the low byte)
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_transient_db_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        _ => false,
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<qrcode::types::QrError> for Error {
    fn from(err: qrcode::types::QrError) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Encoding(format!("payload serialization: {}", err))
    }
}
