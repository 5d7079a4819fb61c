//! Operational HTTP endpoints.
//!
//! - `/api/health`, `/healthz`        : liveness
//! - `/api/readiness`, `/readyz`      : readiness (503 when saturated or draining)
//! - `/api/metrics`                   : telemetry snapshot as JSON
//! - `/api/metrics-prom`, `/metrics`  : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::app_state::AppState;
use crate::obs::TelemetrySnapshot;

const PROM_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub uptime_sec: u64,
    pub timestamp: String,
}

pub async fn healthz(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        uptime_sec: state.uptime_secs(),
        timestamp: timestamp(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Readiness {
    pub status: &'static str,
    pub inflight: usize,
    pub max_inflight: usize,
    pub total_requests: u64,
    pub total_errors: u64,
    pub build_version: String,
    pub timestamp: String,
}

pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let snap = state.telemetry().snapshot();
    let ready = state.is_ready();
    let body = Readiness {
        status: if ready { "ok" } else { "degraded" },
        inflight: state.governor().current(),
        max_inflight: state.governor().max(),
        total_requests: snap.total_requests,
        total_errors: snap.total_errors,
        build_version: state.cfg().gateway.build_version.clone(),
        timestamp: timestamp(),
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    #[serde(flatten)]
    pub snapshot: TelemetrySnapshot,
    pub avg_latency_ms: f64,
    pub timestamp: String,
}

pub async fn metrics_json(State(state): State<AppState>) -> Json<MetricsReport> {
    let snapshot = state.telemetry().snapshot();
    Json(MetricsReport {
        avg_latency_ms: snapshot.avg_latency_ms(),
        snapshot,
        timestamp: timestamp(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let snap = state.telemetry().snapshot();
    let body = state.metrics().render(&snap, state.governor().current());

    (StatusCode::OK, [(header::CONTENT_TYPE, PROM_CONTENT_TYPE)], body).into_response()
}
