#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;

use omnilint_core::protocol::trace::extract_actions;
use omnilint_gateway::app_state::AppState;
use omnilint_gateway::config::GatewayConfig;
use omnilint_gateway::engine::{
    EngineFailure, EngineOutcome, EngineRunner, FallbackPolicy, PolicyEngine,
};
use omnilint_gateway::router::build_router;

const VALID_CODE: &str = "INTENT: Demo\nACTOR:\n- Primary: Tester\nCONTEXT:\n- Domain: Testing\nRULE:\n- IF Temp > 30 THEN Cool\nCONSTRAINT:\n- Technical: OK\nIMPACT:\n- Benefit: Safety\nTRACE:\n- Evidence: Logs\n";

struct FakeEngine {
    name: &'static str,
    stdout: String,
    failure: Option<EngineFailure>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl FakeEngine {
    fn ok(name: &'static str, stdout: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            stdout: stdout.into(),
            failure: None,
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(name: &'static str, failure: EngineFailure) -> Arc<Self> {
        Arc::new(Self {
            name,
            stdout: String::new(),
            failure: Some(failure),
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn gated(name: &'static str, stdout: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            name,
            stdout: stdout.into(),
            failure: None,
            gate: Some(gate),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyEngine for FakeEngine {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, _code: &str, _context: Option<&str>) -> EngineOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.failure {
            Some(f) => EngineOutcome::failed(f.clone()),
            None => EngineOutcome {
                stdout: self.stdout.clone(),
                actions: extract_actions(&self.stdout),
                ..EngineOutcome::default()
            },
        }
    }
}

struct Harness {
    app: Router,
    state: AppState,
    primary: Arc<FakeEngine>,
    secondary: Arc<FakeEngine>,
}

fn harness_with(cfg: GatewayConfig, primary: Arc<FakeEngine>, secondary: Arc<FakeEngine>) -> Harness {
    let runner = EngineRunner::new(
        primary.clone(),
        Some(secondary.clone() as Arc<dyn PolicyEngine>),
        FallbackPolicy::from_flag(cfg.engine.disable_fallback),
    );
    let state = AppState::with_runner(cfg, runner);
    Harness {
        app: build_router(state.clone()),
        state,
        primary,
        secondary,
    }
}

fn harness(cfg: GatewayConfig) -> Harness {
    harness_with(
        cfg,
        FakeEngine::ok("primary", "Evaluating\n-> EXECUTE: Cool\n"),
        FakeEngine::ok("secondary", "-> EXECUTE: Vent\n"),
    )
}

fn validate_req(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/validate")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let rid = resp
        .headers()
        .get("x-request-id")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, rid, body)
}

async fn post(app: &Router, body: Value) -> (StatusCode, Value) {
    let (status, _, v) = send(app, validate_req(body.to_string())).await;
    (status, v)
}

#[tokio::test]
async fn valid_policy_runs_primary_engine() {
    let h = harness(GatewayConfig::default());
    let (status, rid, v) = send(&h.app, validate_req(json!({ "code": VALID_CODE }).to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["errors"], json!([]));
    assert_eq!(v["rules"], json!([{ "condition": "Temp > 30", "action": "Cool" }]));
    assert_eq!(v["actions"], json!(["Cool"]));
    assert_eq!(v["engine"], "primary");
    assert_eq!(v["mode"], "validator");
    assert_eq!(v["compiler"], "not-available");
    assert_eq!(v["capabilities"], json!(["parse", "runtime-eval"]));
    assert!(v["stdout"].as_str().unwrap().contains("-> EXECUTE: Cool"));
    assert!(v["durationMs"].is_u64());
    assert_eq!(rid.as_deref(), v["requestId"].as_str());
    assert_eq!(h.primary.calls(), 1);
    assert_eq!(h.secondary.calls(), 0);
    assert_eq!(h.state.governor().current(), 0);

    let snap = h.state.telemetry().snapshot();
    assert_eq!(snap.total_requests, 1);
    assert_eq!(snap.total_parse_errors, 0);
}

#[tokio::test]
async fn lint_errors_never_reach_an_engine() {
    let h = harness(GatewayConfig::default());
    let (status, v) = post(&h.app, json!({ "code": "RULE:\n- THEN OOPS" })).await;

    assert_eq!(status, StatusCode::OK);
    let messages: Vec<&str> = v["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages.len(), 6);
    for keyword in ["INTENT", "ACTOR", "CONTEXT", "CONSTRAINT", "IMPACT", "TRACE"] {
        let expected = format!("Missing mandatory section: '{keyword}'.");
        assert!(messages.contains(&expected.as_str()), "missing {keyword}");
    }
    assert!(v["errors"].as_array().unwrap().iter().all(|e| e["line"] == 3));
    assert_eq!(v["actions"], json!([]));
    assert_eq!(v["engine"], "none");
    assert_eq!(v["capabilities"], json!(["parse"]));
    assert_eq!(h.primary.calls(), 0);

    let snap = h.state.telemetry().snapshot();
    assert_eq!(snap.total_parse_errors, 1);
    assert_eq!(snap.total_requests, 1);
}

#[tokio::test]
async fn empty_body_reports_missing_sections() {
    let h = harness(GatewayConfig::default());
    let (status, _, v) = send(&h.app, validate_req(Body::empty())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["errors"].as_array().unwrap().len(), 7);
    assert_eq!(h.primary.calls(), 0);
}

#[tokio::test]
async fn third_request_in_window_is_rate_limited() {
    let mut cfg = GatewayConfig::default();
    cfg.rate_limit.max_requests = 2;
    let h = harness(cfg);

    let (s1, _) = post(&h.app, json!({ "code": VALID_CODE })).await;
    let (s2, _) = post(&h.app, json!({ "code": VALID_CODE })).await;
    let (s3, v3) = post(&h.app, json!({ "code": VALID_CODE })).await;

    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(s3, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        v3["errors"],
        json!([{ "line": 0, "message": "Rate limit exceeded. Please retry later." }])
    );
    assert_eq!(v3["capabilities"], json!([]));
    assert_eq!(v3["engine"], "none");
    assert_eq!(h.primary.calls(), 2);

    let snap = h.state.telemetry().snapshot();
    assert_eq!(snap.total_rate_limited, 1);
    assert_eq!(snap.total_requests, 2);
    assert_eq!(h.state.metrics().rejections.get(&[("reason", "rate_limited")]), 1);
}

#[tokio::test]
async fn clients_are_keyed_by_forwarded_for() {
    let mut cfg = GatewayConfig::default();
    cfg.rate_limit.max_requests = 1;
    let h = harness(cfg);

    let req = |ip: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/validate")
            .header("x-forwarded-for", format!("{ip}, 10.0.0.1"))
            .body(Body::from(json!({ "code": VALID_CODE }).to_string()))
            .unwrap()
    };

    assert_eq!(send(&h.app, req("1.1.1.1")).await.0, StatusCode::OK);
    assert_eq!(send(&h.app, req("2.2.2.2")).await.0, StatusCode::OK);
    assert_eq!(send(&h.app, req("1.1.1.1")).await.0, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn body_exactly_at_ceiling_is_accepted() {
    let body = json!({ "code": VALID_CODE }).to_string();
    let mut cfg = GatewayConfig::default();
    cfg.limits.max_body_bytes = body.len();
    let h = harness(cfg);

    let (status, _, _) = send(&h.app, validate_req(body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, v) = send(&h.app, validate_req(format!("{body} "))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(v["errors"], json!([{ "line": 0, "message": "Payload too large." }]));
    assert_eq!(h.primary.calls(), 1);
    assert_eq!(h.state.telemetry().snapshot().total_rate_limited, 1);
}

#[tokio::test]
async fn oversized_code_and_context_are_rejected() {
    let mut cfg = GatewayConfig::default();
    cfg.limits.max_code_bytes = 16;
    cfg.limits.max_context_bytes = 8;
    let h = harness(cfg);

    let (status, v) = post(&h.app, json!({ "code": "x".repeat(17) })).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(v["errors"][0]["message"], "Policy too large.");

    let (status, v) = post(&h.app, json!({ "code": "x".repeat(16), "context": "{\"a\":\"123\"}" })).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(v["errors"][0]["message"], "Context JSON too large.");

    assert_eq!(h.primary.calls(), 0);
    assert_eq!(h.state.governor().current(), 0);
    assert_eq!(
        h.state.metrics().rejections.get(&[("reason", "payload_too_large")]),
        2
    );
}

#[tokio::test]
async fn invalid_context_is_reported_before_execution() {
    let h = harness(GatewayConfig::default());

    let (status, v) = post(&h.app, json!({ "code": VALID_CODE, "context": "{not json" })).await;
    assert_eq!(status, StatusCode::OK);
    let errors = v["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["line"], 0);
    assert!(errors[0]["message"].as_str().unwrap().starts_with("Invalid context JSON: "));
    assert_eq!(v["capabilities"], json!(["parse"]));
    assert_eq!(v["rules"].as_array().unwrap().len(), 1);

    let (_, v) = post(&h.app, json!({ "code": VALID_CODE, "context": "42" })).await;
    assert_eq!(
        v["errors"][0]["message"],
        "Invalid context JSON: Context must be a JSON object or array."
    );

    assert_eq!(h.primary.calls(), 0);
    assert_eq!(h.state.telemetry().snapshot().total_parse_errors, 2);
}

#[tokio::test]
async fn valid_and_blank_context_execute() {
    let h = harness(GatewayConfig::default());
    let (_, v) = post(&h.app, json!({ "code": VALID_CODE, "context": "{\"temp\": 31}" })).await;
    assert_eq!(v["engine"], "primary");
    let (_, v) = post(&h.app, json!({ "code": VALID_CODE, "context": "   " })).await;
    assert_eq!(v["engine"], "primary");
    assert_eq!(h.primary.calls(), 2);
}

#[tokio::test]
async fn malformed_json_is_an_internal_error() {
    let h = harness(GatewayConfig::default());
    for body in ["{\"code\": ", "{\"code\": 5}"] {
        let (status, rid, v) = send(&h.app, validate_req(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
        assert_eq!(
            v["errors"],
            json!([{ "line": 0, "message": "Internal error during validation." }])
        );
        assert_eq!(v["engine"], "none");
        assert!(rid.is_some());
    }
    assert_eq!(h.primary.calls(), 0);
    let snap = h.state.telemetry().snapshot();
    assert_eq!(snap.total_errors, 2);
    assert_eq!(snap.total_parse_errors, 0);
    assert_eq!(h.state.governor().current(), 0);
}

#[tokio::test]
async fn null_code_reads_as_empty_document() {
    let h = harness(GatewayConfig::default());
    for body in ["{\"code\": null, \"context\": null}", "null"] {
        let (status, _, v) = send(&h.app, validate_req(body)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(v["errors"].as_array().unwrap().len(), 7);
        assert_eq!(v["engine"], "none");
    }
    assert_eq!(h.primary.calls(), 0);
    assert_eq!(h.state.telemetry().snapshot().total_errors, 0);
}

#[tokio::test]
async fn aborted_body_is_an_internal_error_not_a_size_rejection() {
    let h = harness(GatewayConfig::default());
    let chunks = vec![
        Ok(Bytes::from_static(b"{\"code\"")),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
    ];
    let body = Body::from_stream(futures_util::stream::iter(chunks));

    let (status, _, v) = send(&h.app, validate_req(body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["errors"][0]["message"], "Internal error during validation.");

    let snap = h.state.telemetry().snapshot();
    assert_eq!(snap.total_errors, 1);
    assert_eq!(snap.total_rate_limited, 0);
    assert_eq!(h.primary.calls(), 0);
}

#[tokio::test]
async fn body_far_over_ceiling_is_rejected_unread() {
    let mut cfg = GatewayConfig::default();
    cfg.limits.max_body_bytes = 64;
    let h = harness(cfg);

    let body = json!({ "code": "x".repeat(128) }).to_string();
    let (status, _, v) = send(&h.app, validate_req(body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(v["errors"], json!([{ "line": 0, "message": "Payload too large." }]));
    assert_eq!(h.state.telemetry().snapshot().total_rate_limited, 1);
    assert_eq!(h.state.telemetry().snapshot().total_errors, 0);
}

#[tokio::test]
async fn primary_infrastructure_failure_uses_secondary() {
    let h = harness_with(
        GatewayConfig::default(),
        FakeEngine::failing("primary", EngineFailure::Spawn("no such file".into())),
        FakeEngine::ok("secondary", "-> EXECUTE: Vent\n"),
    );
    let (status, v) = post(&h.app, json!({ "code": VALID_CODE })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["engine"], "secondary");
    assert_eq!(v["actions"], json!(["Vent"]));
    assert_eq!(h.primary.calls(), 1);
    assert_eq!(h.secondary.calls(), 1);
    assert_eq!(
        h.state
            .metrics()
            .engine_runs
            .get(&[("engine", "secondary"), ("outcome", "ok")]),
        1
    );
}

#[tokio::test]
async fn disabled_fallback_surfaces_primary_failure() {
    let mut cfg = GatewayConfig::default();
    cfg.engine.disable_fallback = true;
    let h = harness_with(
        cfg,
        FakeEngine::failing("primary", EngineFailure::Timeout),
        FakeEngine::ok("secondary", "-> EXECUTE: Vent\n"),
    );
    let (status, v) = post(&h.app, json!({ "code": VALID_CODE })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["engine"], "none");
    assert_eq!(v["stderr"], "engine timed out");
    assert_eq!(v["capabilities"], json!(["parse", "runtime-eval"]));
    assert_eq!(h.secondary.calls(), 0);
}

#[tokio::test]
async fn saturated_gateway_answers_busy() {
    let mut cfg = GatewayConfig::default();
    cfg.admission.max_inflight = 1;
    let gate = Arc::new(Notify::new());
    let h = harness_with(
        cfg,
        FakeEngine::gated("primary", "-> EXECUTE: Cool\n", gate.clone()),
        FakeEngine::ok("secondary", ""),
    );

    let first = tokio::spawn({
        let app = h.app.clone();
        async move { send(&app, validate_req(json!({ "code": VALID_CODE }).to_string())).await }
    });

    for _ in 0..200 {
        if h.state.governor().current() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(h.state.governor().current(), 1);

    let (_, _, ready) = send(&h.app, get("/api/readiness")).await;
    assert_eq!(ready["status"], "degraded");

    let (status, v) = post(&h.app, json!({ "code": VALID_CODE })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(v["errors"][0]["message"], "Server busy. Please retry shortly.");

    gate.notify_one();
    let (status, _, v) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["actions"], json!(["Cool"]));
    assert_eq!(h.state.governor().current(), 0);
    assert_eq!(h.state.metrics().rejections.get(&[("reason", "busy")]), 1);
}

#[tokio::test]
async fn health_and_readiness() {
    let mut cfg = GatewayConfig::default();
    cfg.gateway.build_version = "test-build".into();
    let h = harness(cfg);

    let (status, _, v) = send(&h.app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "ok");
    assert!(v["uptimeSec"].is_u64());
    assert!(v["timestamp"].is_string());

    let (status, _, v) = send(&h.app, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "ok");
    assert_eq!(v["inflight"], 0);
    assert_eq!(v["maxInflight"], 4);
    assert_eq!(v["buildVersion"], "test-build");

    h.state.set_draining();
    let (status, _, v) = send(&h.app, get("/api/readiness")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(v["status"], "degraded");
}

#[tokio::test]
async fn metrics_endpoints_reflect_traffic() {
    let h = harness(GatewayConfig::default());
    post(&h.app, json!({ "code": VALID_CODE })).await;
    post(&h.app, json!({ "code": "INTENT: only" })).await;

    let (status, _, v) = send(&h.app, get("/api/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["totalRequests"], 2);
    assert_eq!(v["totalParseErrors"], 1);
    assert_eq!(v["totalErrors"], 0);
    assert!(v["avgLatencyMs"].is_number());
    assert!(v["lastRequestAt"].is_u64());
    assert!(v.get("lastErrorAt").is_none());

    let resp = h.app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("omnilint_requests_total 2\n"));
    assert!(text.contains("omnilint_parse_errors_total 1\n"));
    assert!(text.contains("omnilint_engine_runs_total{engine=\"primary\",outcome=\"ok\"} 1\n"));
    assert!(text.contains("omnilint_inflight 0\n"));
}
