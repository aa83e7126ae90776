//! Storage layer
//!
//! # Tables
//!
//! - `users` - Participants and their current score
//! - `transactions` - Append-only score deltas (foreign key `user_id`)
//! - `sessions` - Independent named records
//!
//! The [`Store`] trait is the seam between the ledger and the database.
//! [`SqliteStore`] implements it on a pooled SQLite database in WAL mode.

use crate::{
    config::StoreConfig,
    error::Result,
    types::{Participant, ParticipantId, ScoreTransaction, Session},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        full_name TEXT    NOT NULL,
        score     INTEGER NOT NULL DEFAULT 0 CHECK (score >= 0)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_users_full_name ON users (full_name)",
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id          INTEGER NOT NULL REFERENCES users (id),
        score            INTEGER NOT NULL,
        transaction_time TEXT    NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_transactions_user_id ON transactions (user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        session_name TEXT NOT NULL,
        created_at   TEXT NOT NULL
    )
    "#,
];

/// Outcome of an optimistic score commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Score updated and transaction appended
    Committed(ScoreTransaction),

    /// Participant row no longer held the expected score; nothing written
    Stale,
}

/// Durable keyed records for participants, transactions and sessions
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a participant with score 0
    async fn insert_participant(&self, full_name: &str) -> Result<Participant>;

    /// Look up a participant
    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>>;

    /// All participants by ascending ID
    async fn list_participants(&self) -> Result<Vec<Participant>>;

    /// All transactions by ascending ID
    async fn list_transactions(&self) -> Result<Vec<ScoreTransaction>>;

    /// Transactions of one participant by ascending ID
    async fn list_participant_transactions(
        &self,
        id: ParticipantId,
    ) -> Result<Vec<ScoreTransaction>>;

    /// All sessions by ascending ID
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// Insert a session stamped with the current time
    async fn insert_session(&self, session_name: &str) -> Result<Session>;

    /// Atomically set `score = new_score` where it still equals `expected_score`,
    /// and append a transaction row recording `delta`.
    ///
    /// Either both writes land or neither does.
    async fn commit_score_change(
        &self,
        id: ParticipantId,
        expected_score: i64,
        new_score: i64,
        delta: i64,
    ) -> Result<CommitOutcome>;

    /// Release connections; later calls fail
    async fn close(&self) {}
}

/// SQLite-backed store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database described by `config`
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Open and create the schema
    pub async fn connect_and_migrate(config: &StoreConfig) -> Result<Self> {
        let store = Self::connect(config).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indices if absent
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_participant(&self, full_name: &str) -> Result<Participant> {
        // RETURNING leaves the statement unfinished after the first row; an
        // explicit transaction makes the insert visible to other connections
        // once this returns.
        let mut tx = self.pool.begin().await?;

        let participant = sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO users (full_name, score)
            VALUES (?, 0)
            RETURNING id, full_name, score
            "#,
        )
        .bind(full_name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(participant)
    }

    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT id, full_name, score FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn list_participants(&self) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            "SELECT id, full_name, score FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn list_transactions(&self) -> Result<Vec<ScoreTransaction>> {
        let transactions = sqlx::query_as::<_, ScoreTransaction>(
            "SELECT id, user_id, score, transaction_time FROM transactions ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    async fn list_participant_transactions(
        &self,
        id: ParticipantId,
    ) -> Result<Vec<ScoreTransaction>> {
        let transactions = sqlx::query_as::<_, ScoreTransaction>(
            r#"
            SELECT id, user_id, score, transaction_time
            FROM transactions
            WHERE user_id = ?
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT id, session_name, created_at FROM sessions ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn insert_session(&self, session_name: &str) -> Result<Session> {
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (session_name, created_at)
            VALUES (?, ?)
            RETURNING id, session_name, created_at
            "#,
        )
        .bind(session_name)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(session)
    }

    async fn commit_score_change(
        &self,
        id: ParticipantId,
        expected_score: i64,
        new_score: i64,
        delta: i64,
    ) -> Result<CommitOutcome> {
        // The UPDATE is the first statement so the transaction takes the write
        // lock up front instead of upgrading from a read snapshot.
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE users SET score = ? WHERE id = ? AND score = ?")
            .bind(new_score)
            .bind(id)
            .bind(expected_score)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CommitOutcome::Stale);
        }

        let transaction = sqlx::query_as::<_, ScoreTransaction>(
            r#"
            INSERT INTO transactions (user_id, score, transaction_time)
            VALUES (?, ?, ?)
            RETURNING id, user_id, score, transaction_time
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CommitOutcome::Committed(transaction))
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Store closed");
    }
}
