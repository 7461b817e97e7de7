pub mod error;
pub mod routes;
pub mod seed;
pub mod state;
pub mod store;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::store::Store;

/// Mount point of every API route.
pub const API_PREFIX: &str = "/api/v1";

/// Build the axum Router with all API routes and middleware.
/// `seed` loads the demo data set instead of an empty store.
pub fn build_router(seed: bool) -> Router {
    let store = if seed { seed::demo_store() } else { Store::default() };
    router_with_state(AppState::new(store))
}

pub fn router_with_state(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Rules
        .route(
            "/rules",
            get(routes::rules::list_rules).post(routes::rules::create_rule),
        )
        .route("/rules/test", post(routes::rules::test_rule))
        .route("/rules/runs/recent", get(routes::rules::recent_runs))
        .route("/rules/runs/{id}/retry", post(routes::rules::retry_run))
        .route(
            "/rules/{id}",
            put(routes::rules::update_rule).delete(routes::rules::delete_rule),
        )
        .route("/rules/{id}/toggle", post(routes::rules::toggle_rule))
        // Workflows
        .route(
            "/workflows",
            get(routes::workflows::list_workflows).post(routes::workflows::create_workflow),
        )
        .route(
            "/workflows/{id}",
            axum::routing::delete(routes::workflows::delete_workflow),
        )
        .route(
            "/workflows/{id}/toggle",
            post(routes::workflows::toggle_workflow),
        )
        .route(
            "/workflows/{id}/start",
            post(routes::workflows::start_workflow),
        )
        .route("/workflows/{id}/stop", post(routes::workflows::stop_workflow))
        // A/B tests
        .route(
            "/ab-tests",
            get(routes::ab_tests::list_ab_tests).post(routes::ab_tests::create_ab_test),
        )
        .route(
            "/ab-tests/{id}",
            axum::routing::delete(routes::ab_tests::delete_ab_test),
        )
        .route("/ab-tests/{id}/start", post(routes::ab_tests::start_ab_test))
        .route("/ab-tests/{id}/stop", post(routes::ab_tests::stop_ab_test))
        // Inbox
        .route("/inbox/threads", get(routes::inbox::list_threads))
        .route("/inbox/messages", get(routes::inbox::list_messages))
        .route("/inbox/reply", post(routes::inbox::reply))
        .route("/inbox/ai-draft", post(routes::inbox::ai_draft))
        // AI usage
        .route("/ai/usage", get(routes::ai::get_usage))
        .route(
            "/ai/budget",
            get(routes::ai::get_budget).post(routes::ai::set_budget),
        )
        .route("/ai/reset-daily", post(routes::ai::reset_daily))
        // Privacy
        .route(
            "/privacy/retention",
            get(routes::privacy::get_retention).put(routes::privacy::set_retention),
        )
        .route("/privacy/export", post(routes::privacy::request_export))
        .route("/privacy/delete", post(routes::privacy::request_delete))
        .route("/privacy/jobs", get(routes::privacy::list_jobs))
        // Templates & integrations
        .route(
            "/templates",
            get(routes::templates::list_templates).post(routes::templates::create_template),
        )
        .route(
            "/integrations",
            get(routes::integrations::list_integrations),
        )
        .route(
            "/oauth/{provider}/authorize",
            get(routes::integrations::authorize),
        )
        // Mock trigger events
        .route("/events/stream", get(routes::events::sse_runs))
        .route("/events/{trigger}", post(routes::events::fire_event));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the mock backend on `0.0.0.0:<port>`.
pub async fn serve(port: u16, seed: bool) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(listener, seed).await
}

/// Start the mock backend on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(listener: tokio::net::TcpListener, seed: bool) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(seed);

    tracing::info!(seed, "cadence mock backend listening on http://localhost:{actual_port}{API_PREFIX}");

    axum::serve(listener, app).await?;
    Ok(())
}
