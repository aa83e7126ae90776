//! Read projections, registration and identity lookup
//!
//! Nothing here writes a score. Reads are retried on transient store failures;
//! registration is not, since a retry after an unobserved commit would insert a
//! second participant.

use crate::{
    identity::IdentityEncoder,
    metrics::Metrics,
    retry::RetryPolicy,
    storage::Store,
    types::{IdentityImage, IdentityPayload, Participant, ParticipantId, ScoreTransaction, Session},
    Error, Result,
};
use std::sync::Arc;
use tracing::info;

/// Query service over the shared store
pub struct QueryService {
    store: Arc<dyn Store>,
    encoder: Arc<dyn IdentityEncoder>,
    retry: RetryPolicy,
    metrics: Metrics,
}

impl QueryService {
    /// Create a query service
    pub fn new(
        store: Arc<dyn Store>,
        encoder: Arc<dyn IdentityEncoder>,
        retry: RetryPolicy,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            encoder,
            retry,
            metrics,
        }
    }

    /// Register a participant with score 0
    pub async fn register_participant(&self, full_name: &str) -> Result<Participant> {
        if full_name.trim().is_empty() {
            return Err(Error::InvalidOperation(
                "full_name must not be empty".to_string(),
            ));
        }

        // Ids only grow, so the widest id bounds every payload this name can get
        self.encoder.check_capacity(&IdentityPayload {
            id: ParticipantId::MAX,
            full_name: full_name.to_string(),
        })?;

        let participant = self.store.insert_participant(full_name).await?;
        self.metrics.record_registration();
        info!(participant_id = participant.id, "Participant registered");

        Ok(participant)
    }

    /// Look up one participant
    pub async fn get_participant(&self, id: ParticipantId) -> Result<Participant> {
        self.retry
            .execute("get_participant", || self.store.get_participant(id))
            .await?
            .ok_or(Error::ParticipantNotFound(id))
    }

    /// All participants in insertion order
    pub async fn list_participants(&self) -> Result<Vec<Participant>> {
        self.retry
            .execute("list_participants", || self.store.list_participants())
            .await
    }

    /// All transactions in insertion order
    pub async fn list_transactions(&self) -> Result<Vec<ScoreTransaction>> {
        self.retry
            .execute("list_transactions", || self.store.list_transactions())
            .await
    }

    /// Transaction history of one participant
    pub async fn participant_history(&self, id: ParticipantId) -> Result<Vec<ScoreTransaction>> {
        self.get_participant(id).await?;
        self.retry
            .execute("participant_history", || {
                self.store.list_participant_transactions(id)
            })
            .await
    }

    /// All sessions in insertion order
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.retry
            .execute("list_sessions", || self.store.list_sessions())
            .await
    }

    /// Payload handed to the identity encoder
    pub async fn identity_payload(&self, id: ParticipantId) -> Result<IdentityPayload> {
        let participant = self.get_participant(id).await?;
        Ok(IdentityPayload::from(&participant))
    }

    /// Scannable identity code for one participant
    pub async fn identity_image(&self, id: ParticipantId) -> Result<IdentityImage> {
        let payload = self.identity_payload(id).await?;
        let encoder = self.encoder.clone();

        // Rendering is CPU-bound
        let bytes = tokio::task::spawn_blocking(move || encoder.encode(&payload))
            .await
            .map_err(|e| Error::Encoding(format!("render task failed: {}", e)))??;

        Ok(IdentityImage {
            content_type: self.encoder.content_type(),
            bytes,
        })
    }
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::QrPngEncoder;
    use crate::storage::tests::temp_store;
    use crate::ErrorKind;

    async fn service() -> (QueryService, Arc<dyn Store>, tempfile::TempDir) {
        let (store, dir) = temp_store().await;
        let store: Arc<dyn Store> = Arc::new(store);
        let service = QueryService::new(
            store.clone(),
            Arc::new(QrPngEncoder::new(2)),
            RetryPolicy::with_defaults(),
            Metrics::new().unwrap(),
        );
        (service, store, dir)
    }

    #[tokio::test]
    async fn test_register_participant() {
        let (service, _store, _dir) = service().await;

        let alice = service.register_participant("Alice").await.unwrap();
        assert_eq!(alice.id, 1);
        assert_eq!(alice.full_name, "Alice");
        assert_eq!(alice.score, 0);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_name() {
        let (service, store, _dir) = service().await;

        for name in ["", "   "] {
            let err = service.register_participant(name).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        }
        assert!(store.list_participants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_name_beyond_identity_capacity() {
        let (service, store, _dir) = service().await;

        let err = service.register_participant(&"x".repeat(3000)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert!(store.list_participants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_longest_accepted_name_renders() {
        let (service, _store, _dir) = service().await;
        let encoder = QrPngEncoder::new(2);
        let fits = |len: usize| {
            encoder
                .check_capacity(&IdentityPayload {
                    id: ParticipantId::MAX,
                    full_name: "x".repeat(len),
                })
                .is_ok()
        };

        // Invariant: fits(lo) && !fits(hi)
        let (mut lo, mut hi) = (1, 3000);
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if fits(mid) {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let longest = service.register_participant(&"x".repeat(lo)).await.unwrap();
        let image = service.identity_image(longest.id).await.unwrap();
        assert!(image.bytes.starts_with(b"\x89PNG"));

        let err = service.register_participant(&"x".repeat(hi)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[tokio::test]
    async fn test_get_missing_participant() {
        let (service, _store, _dir) = service().await;

        let err = service.get_participant(7).await.unwrap_err();
        assert!(matches!(err, Error::ParticipantNotFound(7)));
    }

    #[tokio::test]
    async fn test_identity_payload() {
        let (service, _store, _dir) = service().await;
        let bob = service.register_participant("Bob").await.unwrap();

        let payload = service.identity_payload(bob.id).await.unwrap();
        assert_eq!(
            payload,
            IdentityPayload {
                id: bob.id,
                full_name: "Bob".to_string()
            }
        );

        assert!(matches!(
            service.identity_payload(bob.id + 1).await,
            Err(Error::ParticipantNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_identity_image() {
        let (service, _store, _dir) = service().await;
        let bob = service.register_participant("Bob").await.unwrap();

        let image = service.identity_image(bob.id).await.unwrap();
        assert_eq!(image.content_type, "image/png");
        assert!(image.bytes.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_history_requires_participant() {
        let (service, store, _dir) = service().await;
        let alice = service.register_participant("Alice").await.unwrap();
        store.commit_score_change(alice.id, 0, 4, 4).await.unwrap();

        assert_eq!(service.participant_history(alice.id).await.unwrap().len(), 1);
        assert!(matches!(
            service.participant_history(99).await,
            Err(Error::ParticipantNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_list_sessions() {
        let (service, store, _dir) = service().await;
        assert!(service.list_sessions().await.unwrap().is_empty());

        store.insert_session("round one").await.unwrap();
        let sessions = service.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].name, "round one");
    }
}
