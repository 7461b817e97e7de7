use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use cadence_core::types::ControlCommand;
use cadence_core::workflow::WorkflowDefinition;

use crate::error::AppError;
use crate::routes::rules::ToggleBody;
use crate::state::AppState;

/// GET /api/v1/workflows
pub async fn list_workflows(State(app): State<AppState>) -> Json<Vec<WorkflowDefinition>> {
    Json(app.store.read().await.workflows.clone())
}

/// POST /api/v1/workflows: created workflows start as drafts.
pub async fn create_workflow(
    State(app): State<AppState>,
    Json(workflow): Json<WorkflowDefinition>,
) -> Result<(StatusCode, Json<WorkflowDefinition>), AppError> {
    let workflow = app.store.write().await.create_workflow(workflow)?;
    Ok((StatusCode::CREATED, Json(workflow)))
}

/// POST /api/v1/workflows/{id}/toggle
pub async fn toggle_workflow(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ToggleBody>,
) -> Result<Json<WorkflowDefinition>, AppError> {
    Ok(Json(app.store.write().await.toggle_workflow(&id, body.enabled)?))
}

/// POST /api/v1/workflows/{id}/start
pub async fn start_workflow(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowDefinition>, AppError> {
    let wf = app.store.write().await.control_workflow(&id, ControlCommand::Start)?;
    Ok(Json(wf))
}

/// POST /api/v1/workflows/{id}/stop
pub async fn stop_workflow(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowDefinition>, AppError> {
    let wf = app.store.write().await.control_workflow(&id, ControlCommand::Stop)?;
    Ok(Json(wf))
}

/// DELETE /api/v1/workflows/{id}
pub async fn delete_workflow(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    app.store.write().await.delete_workflow(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
