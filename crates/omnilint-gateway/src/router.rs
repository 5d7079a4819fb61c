//! Axum router wiring.
//!
//! `/api/validate` is the only route with side effects; the rest are
//! operational and read-only.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    // One byte past the ceiling, so "at limit" and "over limit" stay distinguishable.
    let body_limit = state.size_guard().body_read_limit();
    Router::new()
        .route(
            "/api/validate",
            post(transport::http::validate).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/health", get(ops::healthz))
        .route("/healthz", get(ops::healthz))
        .route("/api/readiness", get(ops::readyz))
        .route("/readyz", get(ops::readyz))
        .route("/api/metrics", get(ops::metrics_json))
        .route("/api/metrics-prom", get(ops::metrics))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
