use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use cadence_core::privacy::{PrivacyJob, PrivacyRequest, RetentionPolicy};
use cadence_core::types::PrivacyJobKind;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/v1/privacy/retention
pub async fn get_retention(State(app): State<AppState>) -> Json<RetentionPolicy> {
    Json(app.store.read().await.retention.clone())
}

/// PUT /api/v1/privacy/retention
pub async fn set_retention(
    State(app): State<AppState>,
    Json(policy): Json<RetentionPolicy>,
) -> Result<Json<RetentionPolicy>, AppError> {
    Ok(Json(app.store.write().await.set_retention(policy)?))
}

/// POST /api/v1/privacy/export
pub async fn request_export(
    State(app): State<AppState>,
    Json(request): Json<PrivacyRequest>,
) -> Result<(StatusCode, Json<PrivacyJob>), AppError> {
    start(app, PrivacyJobKind::Export, request).await
}

/// POST /api/v1/privacy/delete: requires `"confirm": true`.
pub async fn request_delete(
    State(app): State<AppState>,
    Json(request): Json<PrivacyRequest>,
) -> Result<(StatusCode, Json<PrivacyJob>), AppError> {
    start(app, PrivacyJobKind::Delete, request).await
}

async fn start(
    app: AppState,
    kind: PrivacyJobKind,
    request: PrivacyRequest,
) -> Result<(StatusCode, Json<PrivacyJob>), AppError> {
    let job = app.store.write().await.start_privacy_job(kind, request)?;
    tracing::info!(id = %job.id, %kind, "privacy job recorded");
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// GET /api/v1/privacy/jobs: newest first.
pub async fn list_jobs(State(app): State<AppState>) -> Json<Vec<PrivacyJob>> {
    let store = app.store.read().await;
    Json(store.privacy_jobs.iter().rev().cloned().collect())
}
