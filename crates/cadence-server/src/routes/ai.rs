use axum::extract::State;
use axum::Json;
use cadence_core::ai::{budget_status, AiBudget, AiUsage};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/v1/ai/usage
pub async fn get_usage(State(app): State<AppState>) -> Json<AiUsage> {
    Json(app.store.read().await.ai_usage.clone())
}

/// GET /api/v1/ai/budget: the budget plus its current status.
pub async fn get_budget(State(app): State<AppState>) -> Json<Value> {
    let store = app.store.read().await;
    let status = budget_status(&store.ai_usage, &store.ai_budget);
    let mut body = json!(store.ai_budget);
    body["status"] = json!(status);
    Json(body)
}

/// POST /api/v1/ai/budget
pub async fn set_budget(
    State(app): State<AppState>,
    Json(budget): Json<AiBudget>,
) -> Result<Json<AiBudget>, AppError> {
    Ok(Json(app.store.write().await.set_budget(budget)?))
}

/// POST /api/v1/ai/reset-daily
pub async fn reset_daily(State(app): State<AppState>) -> Json<AiUsage> {
    Json(app.store.write().await.reset_daily())
}
