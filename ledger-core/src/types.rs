//! Core types for the scored ledger
//!
//! All values here are immutable snapshots of store rows. Column names follow
//! the persisted schema (`users`, `transactions`, `sessions`); field names follow
//! the domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Store-assigned participant identifier
pub type ParticipantId = i64;

/// Store-assigned transaction identifier
pub type TransactionId = i64;

/// Store-assigned session identifier
pub type SessionId = i64;

/// A registered participant and its current score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Participant {
    /// Participant ID
    pub id: ParticipantId,

    /// Display name, never empty
    pub full_name: String,

    /// Current score, never negative
    pub score: i64,
}

/// One applied score delta. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ScoreTransaction {
    /// Transaction ID
    pub id: TransactionId,

    /// Owning participant
    #[sqlx(rename = "user_id")]
    pub participant_id: ParticipantId,

    /// Signed score change
    #[sqlx(rename = "score")]
    pub delta: i64,

    /// Commit time (UTC)
    #[sqlx(rename = "transaction_time")]
    pub created_at: DateTime<Utc>,
}

/// Independent named, timestamped record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Session ID
    pub id: SessionId,

    /// Session name
    #[sqlx(rename = "session_name")]
    pub name: String,

    /// Creation time (UTC)
    pub created_at: DateTime<Utc>,
}

/// Minimal structured identity handed to the identity encoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPayload {
    /// Participant ID
    pub id: ParticipantId,

    /// Participant display name
    pub full_name: String,
}

impl From<&Participant> for IdentityPayload {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id,
            full_name: participant.full_name.clone(),
        }
    }
}

/// Rendered identity code
#[derive(Debug, Clone)]
pub struct IdentityImage {
    /// MIME type of `bytes`
    pub content_type: &'static str,

    /// Encoded image
    pub bytes: Vec<u8>,
}

/// Result of an accepted score change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreChange {
    /// Participant whose score changed
    pub participant_id: ParticipantId,

    /// Applied delta
    pub delta: i64,

    /// Score after the change
    pub new_score: i64,

    /// Appended transaction row
    pub transaction_id: TransactionId,
}
