use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use scoreboard_ledger::{Error as LedgerError, ErrorKind};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": error_message,
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Ledger(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::InvalidOperation => StatusCode::BAD_REQUEST,
                ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    fn error_type(&self) -> &str {
        match self {
            ApiError::Ledger(e) => match e {
                LedgerError::ParticipantNotFound(_) => "not_found",
                LedgerError::InsufficientBalance { .. } => "insufficient_balance",
                LedgerError::InvalidOperation(_) => "validation_error",
                _ if e.is_retryable() => "service_unavailable",
                LedgerError::Encoding(_) => "encoding_error",
                LedgerError::Database(_) => "database_error",
                _ => "internal_error",
            },
            ApiError::BadRequest(_) => "validation_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}
