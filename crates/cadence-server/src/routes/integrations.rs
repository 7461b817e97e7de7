use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use cadence_core::integration::Integration;
use cadence_core::types::Provider;
use chrono::Utc;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/v1/integrations: one entry per supported provider.
pub async fn list_integrations(State(app): State<AppState>) -> Json<Vec<Integration>> {
    Json(app.store.read().await.integrations())
}

/// GET /api/v1/oauth/{provider}/authorize
///
/// There is no real provider behind the mock, so authorizing connects the
/// integration immediately. Browsers are redirected to the integration list;
/// JSON callers get the updated integration.
pub async fn authorize(
    State(app): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let provider: Provider = provider.parse()?;
    let integration = Integration {
        provider,
        connected: true,
        account_name: Some(format!("demo-{provider}")),
        connected_at: Some(Utc::now()),
    };
    {
        let mut store = app.store.write().await;
        store.integrations.retain(|i| i.provider != provider);
        store.integrations.push(integration.clone());
    }
    tracing::info!(%provider, "integration connected");

    let wants_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    if wants_json {
        Ok((StatusCode::OK, Json(integration)).into_response())
    } else {
        Ok(Redirect::to("/api/v1/integrations").into_response())
    }
}
