use crate::errors::ApiError;
use crate::models::{
    QrQuery, RegisterRequest, ScoreChangeRequest, ScoreChangeResponse, SessionOut,
    TransactionOut, UserOut,
};
use actix_web::{error, web, HttpRequest, HttpResponse};
use scoreboard_ledger::{Ledger, ParticipantId};
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "scoreboard-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Register participant endpoint
pub async fn register(
    ledger: web::Data<Arc<Ledger>>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let participant = ledger
        .queries()
        .register_participant(&request.full_name)
        .await?;
    Ok(HttpResponse::Ok().json(UserOut::from(participant)))
}

/// Apply score change endpoint
pub async fn update_score(
    ledger: web::Data<Arc<Ledger>>,
    request: web::Json<ScoreChangeRequest>,
) -> Result<HttpResponse, ApiError> {
    let change = ledger
        .engine()
        .apply_score_change(request.user_id, request.score_change)
        .await?;
    Ok(HttpResponse::Ok().json(ScoreChangeResponse::from(change)))
}

/// Identity QR code endpoint
pub async fn identity_qr(
    ledger: web::Data<Arc<Ledger>>,
    query: web::Query<QrQuery>,
) -> Result<HttpResponse, ApiError> {
    let image = ledger.queries().identity_image(query.user_id).await?;
    Ok(HttpResponse::Ok()
        .content_type(image.content_type)
        .body(image.bytes))
}

/// Get participant endpoint
pub async fn get_user(
    ledger: web::Data<Arc<Ledger>>,
    user_id: web::Path<ParticipantId>,
) -> Result<HttpResponse, ApiError> {
    let participant = ledger.queries().get_participant(*user_id).await?;
    Ok(HttpResponse::Ok().json(UserOut::from(participant)))
}

/// Transaction history of one participant
pub async fn get_user_transactions(
    ledger: web::Data<Arc<Ledger>>,
    user_id: web::Path<ParticipantId>,
) -> Result<HttpResponse, ApiError> {
    let history = ledger.queries().participant_history(*user_id).await?;
    let body: Vec<TransactionOut> = history.into_iter().map(TransactionOut::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// List participants endpoint
pub async fn list_users(ledger: web::Data<Arc<Ledger>>) -> Result<HttpResponse, ApiError> {
    let participants = ledger.queries().list_participants().await?;
    let body: Vec<UserOut> = participants.into_iter().map(UserOut::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// List transactions endpoint
pub async fn list_transactions(ledger: web::Data<Arc<Ledger>>) -> Result<HttpResponse, ApiError> {
    let transactions = ledger.queries().list_transactions().await?;
    let body: Vec<TransactionOut> = transactions.into_iter().map(TransactionOut::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// List sessions endpoint
pub async fn list_sessions(ledger: web::Data<Arc<Ledger>>) -> Result<HttpResponse, ApiError> {
    let sessions = ledger.queries().list_sessions().await?;
    let body: Vec<SessionOut> = sessions.into_iter().map(SessionOut::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// Prometheus metrics endpoint
pub async fn metrics_endpoint(ledger: web::Data<Arc<Ledger>>) -> Result<HttpResponse, ApiError> {
    let body = ledger
        .metrics()
        .gather_text()
        .map_err(|e| ApiError::Internal(format!("failed to gather metrics: {e}")))?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .route("/register", web::post().to(register))
        .route("/update-score", web::post().to(update_score))
        .route("/qr", web::get().to(identity_qr))
        .route("/user/{user_id}", web::get().to(get_user))
        .route("/user/{user_id}/transactions", web::get().to(get_user_transactions))
        .route("/users", web::get().to(list_users))
        .route("/transactions", web::get().to(list_transactions))
        .route("/sessions", web::get().to(list_sessions))
        .route("/metrics", web::get().to(metrics_endpoint))
        .route("/health", web::get().to(health_check));
}
