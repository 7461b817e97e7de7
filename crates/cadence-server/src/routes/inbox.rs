use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use cadence_core::inbox::{AiDraft, AiDraftRequest, Message, ReplyRequest, Thread};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct MessagesQuery {
    pub thread_id: String,
}

/// GET /api/v1/inbox/threads: most recent conversation first.
pub async fn list_threads(State(app): State<AppState>) -> Json<Vec<Thread>> {
    Json(app.store.read().await.threads())
}

/// GET /api/v1/inbox/messages?thread_id=...
pub async fn list_messages(
    State(app): State<AppState>,
    Query(q): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, AppError> {
    Ok(Json(app.store.read().await.messages(&q.thread_id)?))
}

/// POST /api/v1/inbox/reply
pub async fn reply(
    State(app): State<AppState>,
    Json(request): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = app.store.write().await.reply(request)?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/v1/inbox/ai-draft: counts against today's AI usage.
pub async fn ai_draft(
    State(app): State<AppState>,
    Json(request): Json<AiDraftRequest>,
) -> Result<Json<AiDraft>, AppError> {
    Ok(Json(app.store.write().await.ai_draft(request)?))
}
