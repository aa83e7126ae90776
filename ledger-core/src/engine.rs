//! Ledger engine: the only writer of participant scores
//!
//! Every accepted change updates the participant row and appends one
//! transaction row in a single store commit, so at all times
//!
//! ```text
//! score(p) == Σ delta  over transactions of p
//! score(p) >= 0
//! ```
//!
//! # Concurrency
//!
//! Writes to one participant are serialized through a keyed async mutex held
//! for the whole read → validate → commit sequence. The commit itself is also
//! conditional on the score read, so a writer outside this process can only
//! cause a retryable [`Error::Conflict`], never a lost update. Writes to
//! different participants proceed in parallel. A participant's mutex lives in
//! the lock table only while some caller holds or awaits it.

use crate::{
    metrics::Metrics,
    retry::RetryPolicy,
    storage::{CommitOutcome, Store},
    types::{ParticipantId, ScoreChange},
    Error, ErrorKind, Result,
};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

/// Check a delta against the current score and return the resulting score
///
/// Debits may bring the score to exactly zero, never below.
pub fn validate_score_change(current: i64, delta: i64) -> Result<i64> {
    if delta < 0 && delta.unsigned_abs() > current.unsigned_abs() {
        return Err(Error::InsufficientBalance {
            requested: delta.unsigned_abs(),
            available: current,
        });
    }

    current.checked_add(delta).ok_or_else(|| {
        Error::InvalidOperation(format!(
            "score change {} overflows current score {}",
            delta, current
        ))
    })
}

/// Applies score changes atomically
pub struct LedgerEngine {
    store: Arc<dyn Store>,
    retry: RetryPolicy,
    metrics: Metrics,
    locks: DashMap<ParticipantId, Arc<Mutex<()>>>,
}

impl LedgerEngine {
    /// Create an engine over `store`
    pub fn new(store: Arc<dyn Store>, retry: RetryPolicy, metrics: Metrics) -> Self {
        Self {
            store,
            retry,
            metrics,
            locks: DashMap::new(),
        }
    }

    /// Serialization point for one participant
    async fn lock_participant(&self, id: ParticipantId) -> ParticipantLease<'_> {
        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let mut lease = ParticipantLease {
            locks: &self.locks,
            id,
            guard: None,
        };
        lease.guard = Some(lock.lock_owned().await);
        lease
    }

    /// Apply `delta` to the participant's score
    ///
    /// Fails with [`Error::ParticipantNotFound`] for unknown participants and
    /// [`Error::InsufficientBalance`] when a debit exceeds the score. A failed
    /// call leaves score and history untouched. Not idempotent: every accepted
    /// call appends one transaction.
    pub async fn apply_score_change(
        &self,
        participant_id: ParticipantId,
        delta: i64,
    ) -> Result<ScoreChange> {
        let _lease = self.lock_participant(participant_id).await;

        let result = self
            .retry
            .execute("apply_score_change", || self.try_apply(participant_id, delta))
            .await;

        match &result {
            Ok(change) => {
                self.metrics.record_applied();
                info!(
                    participant_id,
                    delta,
                    new_score = change.new_score,
                    transaction_id = change.transaction_id,
                    "Score change applied"
                );
            }
            Err(e) => match e.kind() {
                ErrorKind::NotFound | ErrorKind::InvalidOperation => {
                    self.metrics.record_rejected();
                    warn!(participant_id, delta, error = %e, "Score change rejected");
                }
                ErrorKind::Transient | ErrorKind::Internal => {
                    self.metrics.record_failed();
                    warn!(participant_id, delta, error = %e, "Score change failed");
                }
            },
        }

        result
    }

    /// One attempt against fresh state
    async fn try_apply(&self, participant_id: ParticipantId, delta: i64) -> Result<ScoreChange> {
        let participant = self
            .store
            .get_participant(participant_id)
            .await?
            .ok_or(Error::ParticipantNotFound(participant_id))?;

        let new_score = validate_score_change(participant.score, delta)?;

        match self
            .store
            .commit_score_change(participant_id, participant.score, new_score, delta)
            .await?
        {
            CommitOutcome::Committed(transaction) => Ok(ScoreChange {
                participant_id,
                delta,
                new_score,
                transaction_id: transaction.id,
            }),
            CommitOutcome::Stale => Err(Error::Conflict(participant_id)),
        }
    }
}

/// Held participant lock; unused table entries are dropped on release
struct ParticipantLease<'a> {
    locks: &'a DashMap<ParticipantId, Arc<Mutex<()>>>,
    id: ParticipantId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ParticipantLease<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Clones are taken under the shard lock, so a count of 1 means the
        // table holds the only reference
        self.locks.remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("retry", &self.retry)
            .field("tracked_participants", &self.locks.len())
            .finish()
    }
}
