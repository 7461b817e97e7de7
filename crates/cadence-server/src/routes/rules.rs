use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use cadence_core::rule::{RuleDefinition, RuleRun, RuleTestRequest, RuleTestResult};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_RUN_LIMIT: usize = 20;

#[derive(Deserialize)]
pub struct ToggleBody {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/rules
pub async fn list_rules(State(app): State<AppState>) -> Json<Vec<RuleDefinition>> {
    Json(app.store.read().await.rules.clone())
}

/// POST /api/v1/rules
pub async fn create_rule(
    State(app): State<AppState>,
    Json(rule): Json<RuleDefinition>,
) -> Result<(StatusCode, Json<RuleDefinition>), AppError> {
    let rule = app.store.write().await.create_rule(rule)?;
    tracing::debug!(id = rule.id_or_empty(), "rule created");
    Ok((StatusCode::CREATED, Json(rule)))
}

/// PUT /api/v1/rules/{id}
pub async fn update_rule(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(rule): Json<RuleDefinition>,
) -> Result<Json<RuleDefinition>, AppError> {
    Ok(Json(app.store.write().await.update_rule(&id, rule)?))
}

/// DELETE /api/v1/rules/{id}
pub async fn delete_rule(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    app.store.write().await.delete_rule(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/rules/{id}/toggle: set `enabled` to the requested value.
pub async fn toggle_rule(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ToggleBody>,
) -> Result<Json<RuleDefinition>, AppError> {
    Ok(Json(app.store.write().await.toggle_rule(&id, body.enabled)?))
}

/// POST /api/v1/rules/test: dry-run a rule, nothing is recorded.
pub async fn test_rule(
    Json(request): Json<RuleTestRequest>,
) -> Result<Json<RuleTestResult>, AppError> {
    request
        .rule
        .condition
        .validate()
        .into_result()?;
    Ok(Json(request.rule.test(&request.payload)))
}

/// GET /api/v1/rules/runs/recent?limit=N: newest first.
pub async fn recent_runs(
    State(app): State<AppState>,
    Query(q): Query<RecentQuery>,
) -> Json<Vec<RuleRun>> {
    let limit = q.limit.unwrap_or(DEFAULT_RUN_LIMIT);
    Json(app.store.read().await.recent_runs(limit))
}

/// POST /api/v1/rules/runs/{id}/retry: requeue a failed run. The run
/// settles to `success` shortly after.
pub async fn retry_run(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RuleRun>, AppError> {
    let run = app.store.write().await.retry_run(&id)?;
    app.publish(run.clone());
    app.settle_later(run.id.clone());
    Ok(Json(run))
}
