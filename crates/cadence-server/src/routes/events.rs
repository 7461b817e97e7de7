use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use cadence_core::rule::RuleRun;
use cadence_core::types::Trigger;
use serde_json::Value;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/v1/events/{trigger}: evaluate enabled rules for `trigger`
/// against the JSON body and return the runs that started.
pub async fn fire_event(
    State(app): State<AppState>,
    Path(trigger): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Vec<RuleRun>>, AppError> {
    let trigger: Trigger = trigger.parse()?;
    let runs = app.store.write().await.fire(trigger, &payload);
    for run in &runs {
        app.publish(run.clone());
    }
    Ok(Json(runs))
}

/// GET /api/v1/events/stream: SSE stream emitting `rule_run` with the run as
/// JSON whenever a run is created or changes status.
pub async fn sse_runs(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let rx = app.run_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        let run = msg.ok()?;
        let data = serde_json::to_string(&run).ok()?;
        Some(Ok::<Event, Infallible>(
            Event::default().event("rule_run").data(data),
        ))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
