use axum::http::StatusCode;
use cadence_server::state::AppState;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut req = axum::http::Request::builder().method(method).uri(uri);
    let body = match body {
        Some(b) => {
            req = req.header("content-type", "application/json");
            axum::body::Body::from(serde_json::to_vec(&b).unwrap())
        }
        None => axum::body::Body::empty(),
    };
    let response = app.oneshot(req.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None).await
}

/// Send a POST request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(body)).await
}

/// Router sharing one store across requests.
fn app() -> (axum::Router, AppState) {
    let state = AppState::default();
    (cadence_server::router_with_state(state.clone()), state)
}

fn rule_body() -> serde_json::Value {
    json!({
        "name": "Pause weak posts",
        "description": "Pause posts under 2% engagement",
        "trigger": "post_performance",
        "condition": {"field": "engagement_rate", "operator": "lt", "value": 0.02},
        "actions": [{"type": "pause_underperformer", "params": {"notify": true}}],
        "enabled": true
    })
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_then_list_rules() {
    let (app, _) = app();
    let (status, created) = post_json(app.clone(), "/api/v1/rules", rule_body()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].as_str().unwrap().starts_with("rule-"));

    let (status, list) = get(app, "/api/v1/rules").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_rule_returns_field_errors() {
    let (app, _) = app();
    let mut body = rule_body();
    body["name"] = json!("");
    body["actions"] = json!([]);
    let (status, err) = post_json(app, "/api/v1/rules", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["fields"]["name"], "Name is required");
    assert!(err["fields"]["actions"].is_string());
}

#[tokio::test]
async fn toggle_sets_requested_state() {
    let (app, _) = app();
    let (_, created) = post_json(app.clone(), "/api/v1/rules", rule_body()).await;
    let id = created["id"].as_str().unwrap();

    let uri = format!("/api/v1/rules/{id}/toggle");
    let (status, rule) = post_json(app.clone(), &uri, json!({"enabled": false})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rule["enabled"], false);

    let (status, _) = post_json(app, "/api/v1/rules/missing/toggle", json!({"enabled": true})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_rule_then_404() {
    let (app, _) = app();
    let (_, created) = post_json(app.clone(), "/api/v1/rules", rule_body()).await;
    let uri = format!("/api/v1/rules/{}", created["id"].as_str().unwrap());

    let (status, _) = send(app.clone(), "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_endpoint_reports_without_recording() {
    let (app, _) = app();
    let (status, result) = post_json(
        app.clone(),
        "/api/v1/rules/test",
        json!({"rule": rule_body(), "payload": {"engagement_rate": 0.01}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["condition_met"], true);
    assert_eq!(result["actions"], json!(["pause_underperformer"]));

    let (_, runs) = get(app, "/api/v1/rules/runs/recent").await;
    assert!(runs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn fired_event_creates_runs_and_failed_run_retries() {
    let (app, state) = app();
    post_json(app.clone(), "/api/v1/rules", rule_body()).await;
    let mut rx = state.run_tx.subscribe();

    let (status, runs) = post_json(
        app.clone(),
        "/api/v1/events/post_performance",
        json!({"engagement_rate": 0.01, "simulate_failure": true}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs[0]["status"], "failed");
    let run_id = runs[0]["id"].as_str().unwrap().to_string();
    assert_eq!(rx.recv().await.unwrap().id, run_id);

    let (status, run) = post_json(
        app.clone(),
        &format!("/api/v1/rules/runs/{run_id}/retry"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["status"], "pending");

    // Pending publish, then the settled run.
    rx.recv().await.unwrap();
    let settled = rx.recv().await.unwrap();
    assert_eq!(settled.id, run_id);
    assert_eq!(settled.status.as_str(), "success");

    let (status, _) = post_json(
        app,
        &format!("/api/v1/rules/runs/{run_id}/retry"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_trigger_is_rejected() {
    let (app, _) = app();
    let (status, err) = post_json(app, "/api/v1/events/full_moon", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().unwrap().contains("full_moon"));
}

// ---------------------------------------------------------------------------
// Workflows and A/B tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn workflow_start_stop_lifecycle() {
    let (app, _) = app();
    let (status, wf) = post_json(
        app.clone(),
        "/api/v1/workflows",
        json!({
            "name": "Welcome",
            "description": "Greet new followers",
            "trigger_type": "inbox_message_received",
            "steps": [
                {"id": "s1", "name": "Wait", "step_type": "delay", "config": {"seconds": 60},
                 "position": 1, "next_steps": [2]},
                {"id": "s2", "name": "Notify", "step_type": "notification",
                 "config": {"channel": "slack", "message": "hello"}, "position": 2}
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{wf}");
    assert_eq!(wf["status"], "draft");
    let id = wf["id"].as_str().unwrap();

    let (status, _) = post_json(app.clone(), &format!("/api/v1/workflows/{id}/stop"), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, wf) = post_json(app.clone(), &format!("/api/v1/workflows/{id}/start"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wf["status"], "active");
    assert_eq!(wf["enabled"], true);

    let (_, wf) = post_json(app, &format!("/api/v1/workflows/{id}/stop"), json!({})).await;
    assert_eq!(wf["status"], "paused");
}

#[tokio::test]
async fn cyclic_workflow_is_rejected() {
    let (app, _) = app();
    let (status, err) = post_json(
        app,
        "/api/v1/workflows",
        json!({
            "name": "Loop",
            "description": "never ends",
            "trigger_type": "schedule_posted",
            "steps": [
                {"id": "a", "name": "A", "step_type": "delay", "config": {"seconds": 5},
                 "position": 1, "next_steps": [2]},
                {"id": "b", "name": "B", "step_type": "delay", "config": {"seconds": 5},
                 "position": 2, "next_steps": [1]}
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["fields"]["steps"].as_str().unwrap().contains("cycle"));
}

#[tokio::test]
async fn ab_test_split_must_sum_to_one() {
    let (app, _) = app();
    let body = |split: [f64; 2]| {
        json!({
            "name": "Caption length",
            "hypothesis": "Short captions win",
            "test_type": "content",
            "variants": [
                {"name": "A", "traffic_percentage": split[0], "is_control": true},
                {"name": "B", "traffic_percentage": split[1]}
            ]
        })
    };
    let (status, _) = post_json(app.clone(), "/api/v1/ab-tests", body([0.3, 0.3])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, test) = post_json(app.clone(), "/api/v1/ab-tests", body([0.5, 0.5])).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = test["id"].as_str().unwrap();
    let (_, test) = post_json(app, &format!("/api/v1/ab-tests/{id}/start"), json!({})).await;
    assert_eq!(test["status"], "running");
}

// ---------------------------------------------------------------------------
// Inbox, AI, privacy, integrations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn seeded_inbox_reply_and_draft() {
    let app = cadence_server::build_router(true);
    let (_, threads) = get(app.clone(), "/api/v1/inbox/threads").await;
    let thread_id = threads[0]["id"].as_str().unwrap().to_string();

    let (status, messages) = get(
        app.clone(),
        &format!("/api/v1/inbox/messages?thread_id={thread_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!messages.as_array().unwrap().is_empty());

    let (status, reply) = post_json(
        app.clone(),
        "/api/v1/inbox/reply",
        json!({"thread_id": thread_id, "body": "Yes, we do!"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["direction"], "outbound");

    let (_, before) = get(app.clone(), "/api/v1/ai/usage").await;
    let (status, draft) = post_json(
        app.clone(),
        "/api/v1/inbox/ai-draft",
        json!({"thread_id": thread_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!draft["body"].as_str().unwrap().is_empty());
    let (_, after) = get(app, "/api/v1/ai/usage").await;
    assert_eq!(
        after["requests_today"].as_u64().unwrap(),
        before["requests_today"].as_u64().unwrap() + 1
    );
}

#[tokio::test]
async fn messages_for_unknown_thread_is_404() {
    let (app, _) = app();
    let (status, _) = get(app, "/api/v1/inbox/messages?thread_id=nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn budget_reports_status() {
    let (app, _) = app();
    let (status, _) = post_json(
        app.clone(),
        "/api/v1/ai/budget",
        json!({"daily_limit": 5.0, "monthly_limit": 50.0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, budget) = get(app, "/api/v1/ai/budget").await;
    assert_eq!(budget["daily_limit"], 5.0);
    assert_eq!(budget["status"]["daily"], "ok");
}

#[tokio::test]
async fn privacy_delete_needs_confirmation() {
    let (app, _) = app();
    let (status, _) = post_json(
        app.clone(),
        "/api/v1/privacy/delete",
        json!({"subject": "ana@example.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, job) = post_json(
        app.clone(),
        "/api/v1/privacy/delete",
        json!({"subject": "ana@example.com", "confirm": true}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(job["status"], "completed");

    let (_, jobs) = get(app, "/api/v1/privacy/jobs").await;
    assert_eq!(jobs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn retention_out_of_range_is_rejected() {
    let (app, _) = app();
    let (status, _) = send(
        app,
        "PUT",
        "/api/v1/privacy/retention",
        Some(json!({"retention_days": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oauth_authorize_connects_provider() {
    let (app, _) = app();
    let req = axum::http::Request::builder()
        .uri("/api/v1/oauth/tiktok/authorize")
        .header("accept", "application/json")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, list) = get(app.clone(), "/api/v1/integrations").await;
    let tiktok = list
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["provider"] == "tiktok")
        .unwrap();
    assert_eq!(tiktok["connected"], true);

    let (status, _) = get(app, "/api/v1/oauth/myspace/authorize").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
