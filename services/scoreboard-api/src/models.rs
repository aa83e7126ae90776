use chrono::{DateTime, Utc};
use scoreboard_ledger::{Participant, ParticipantId, ScoreChange, ScoreTransaction, Session};
use serde::{Deserialize, Serialize};

/// Participant registration request
#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub full_name: String,
}

/// Score change request
#[derive(Debug, Deserialize, Serialize)]
pub struct ScoreChangeRequest {
    pub user_id: ParticipantId,
    pub score_change: i64,
}

/// Score change response
#[derive(Debug, Deserialize, Serialize)]
pub struct ScoreChangeResponse {
    pub message: String,
    pub new_score: i64,
}

#[derive(Debug, Deserialize)]
pub struct QrQuery {
    pub user_id: ParticipantId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserOut {
    pub id: ParticipantId,
    pub full_name: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransactionOut {
    pub id: i64,
    pub user_id: ParticipantId,
    pub score: i64,
    pub transaction_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionOut {
    pub id: i64,
    pub session_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Participant> for UserOut {
    fn from(participant: Participant) -> Self {
        Self {
            id: participant.id,
            full_name: participant.full_name,
            score: participant.score,
        }
    }
}

impl From<ScoreTransaction> for TransactionOut {
    fn from(transaction: ScoreTransaction) -> Self {
        Self {
            id: transaction.id,
            user_id: transaction.participant_id,
            score: transaction.delta,
            transaction_time: transaction.created_at,
        }
    }
}

impl From<Session> for SessionOut {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            session_name: session.name,
            created_at: session.created_at,
        }
    }
}

impl From<ScoreChange> for ScoreChangeResponse {
    fn from(change: ScoreChange) -> Self {
        Self {
            message: "Score updated".to_string(),
            new_score: change.new_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_wire_names() {
        let transaction = ScoreTransaction {
            id: 3,
            participant_id: 1,
            delta: -5,
            created_at: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };

        let value = serde_json::to_value(TransactionOut::from(transaction)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 3,
                "user_id": 1,
                "score": -5,
                "transaction_time": "2024-05-01T12:00:00Z"
            })
        );
    }

    #[test]
    fn test_score_change_request_rejects_fractional_delta() {
        let parsed =
            serde_json::from_str::<ScoreChangeRequest>(r#"{"user_id":1,"score_change":1.5}"#);
        assert!(parsed.is_err());
    }
}
