use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::context::DigestRequest;
use super::service::DigestService;
use super::summary::views::Summary;
use super::validator::{ValidationReport, ValidationRequest};
use crate::error::AppError;

/// Request bodies are bounded by the payload guard, not by the transport.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct DigestResponse {
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub report: String,
}

/// Router builder exposing the digest and validation endpoints.
pub fn digest_router(service: Arc<DigestService>) -> Router {
    Router::new()
        .route("/api/v1/digest", post(digest_handler))
        .route("/api/v1/digest/validate", post(validate_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(service)
}

pub(crate) async fn digest_handler(
    State(service): State<Arc<DigestService>>,
    payload: Result<Json<DigestRequest>, JsonRejection>,
) -> Result<Json<DigestResponse>, AppError> {
    let Json(request) = payload?;
    // scoring and ranking are CPU-bound; keep them off the async workers
    let outcome = tokio::task::spawn_blocking(move || service.digest(request)).await??;

    Ok(Json(DigestResponse {
        generated_at: Utc::now(),
        summary: outcome.summary,
        report: outcome.report,
    }))
}

pub(crate) async fn validate_handler(
    State(service): State<Arc<DigestService>>,
    payload: Result<Json<ValidationRequest>, JsonRejection>,
) -> Result<Json<ValidationReport>, AppError> {
    let Json(request) = payload?;
    Ok(Json(
        service.validate(&request.generated_text, &request.summary_text),
    ))
}
