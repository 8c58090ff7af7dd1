//! Biolink server library logic.

pub mod api;
pub mod api_admin;
pub mod api_analytics;
pub mod api_events;
pub mod api_feedback;
pub mod authz;
pub mod config;
pub mod middleware;
pub mod retention;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use biolink_db::DbPool;
use biolink_identity::IdentityProvider;
use biolink_types::RetentionPolicy;
use config::AccessConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Resolves credentials to principals.
    pub identity: Arc<dyn IdentityProvider>,
    /// Protected prefixes and gate behaviour.
    pub access: AccessConfig,
    /// Window used by manual and background sweeps.
    pub retention: RetentionPolicy,
}

/// Maximum request body size (64 KiB). Every body this server accepts is small JSON.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/api/analytics",
            get(api_analytics::grouped_analytics_handler),
        )
        .route(
            "/api/analytics/summary",
            get(api_analytics::summary_handler),
        )
        .route(
            "/api/users/{user_id}/activity",
            get(api_analytics::user_activity_handler),
        )
        .route("/api/feedback", post(api_feedback::submit_feedback_handler))
        .route("/api/admin/users", get(api_admin::list_users_handler))
        .route(
            "/api/admin/users/{user_id}/activity",
            get(api_admin::user_activity_handler),
        )
        .route("/api/admin/feedback", get(api_admin::list_feedback_handler))
        .route(
            "/api/admin/feedback/{id}/response",
            post(api_admin::respond_to_feedback_handler),
        )
        .route(
            "/api/admin/retention/sweep",
            post(api_admin::retention_sweep_handler),
        )
        .route_layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/health", get(health))
        .route("/api/events", post(api_events::ingest_event_handler))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::access_gate))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
