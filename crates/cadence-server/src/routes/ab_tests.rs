use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use cadence_core::abtest::AbTestDefinition;
use cadence_core::types::ControlCommand;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/v1/ab-tests
pub async fn list_ab_tests(State(app): State<AppState>) -> Json<Vec<AbTestDefinition>> {
    Json(app.store.read().await.ab_tests.clone())
}

/// POST /api/v1/ab-tests
pub async fn create_ab_test(
    State(app): State<AppState>,
    Json(test): Json<AbTestDefinition>,
) -> Result<(StatusCode, Json<AbTestDefinition>), AppError> {
    let test = app.store.write().await.create_ab_test(test)?;
    Ok((StatusCode::CREATED, Json(test)))
}

/// POST /api/v1/ab-tests/{id}/start
pub async fn start_ab_test(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AbTestDefinition>, AppError> {
    let test = app.store.write().await.control_ab_test(&id, ControlCommand::Start)?;
    Ok(Json(test))
}

/// POST /api/v1/ab-tests/{id}/stop
pub async fn stop_ab_test(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AbTestDefinition>, AppError> {
    let test = app.store.write().await.control_ab_test(&id, ControlCommand::Stop)?;
    Ok(Json(test))
}

/// DELETE /api/v1/ab-tests/{id}
pub async fn delete_ab_test(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    app.store.write().await.delete_ab_test(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
