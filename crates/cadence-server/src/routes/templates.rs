use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use cadence_core::template::Template;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/v1/templates
pub async fn list_templates(State(app): State<AppState>) -> Json<Vec<Template>> {
    Json(app.store.read().await.templates.clone())
}

/// POST /api/v1/templates
pub async fn create_template(
    State(app): State<AppState>,
    Json(template): Json<Template>,
) -> Result<(StatusCode, Json<Template>), AppError> {
    let template = app.store.write().await.create_template(template)?;
    Ok((StatusCode::CREATED, Json(template)))
}
