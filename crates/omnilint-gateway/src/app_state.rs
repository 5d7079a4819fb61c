//! Shared application state for the OmniLint gateway.
//!
//! Everything a request touches lives behind one `Arc` so handlers clone a
//! pointer, not the limiter or telemetry. Startup errors are returned, never
//! panicked on.

use std::sync::Arc;
use std::time::Instant;

use omnilint_core::error::Result;

use crate::admission::{InflightGovernor, SizeGuard, SlidingWindowLimiter};
use crate::config::GatewayConfig;
use crate::engine::EngineRunner;
use crate::obs::{GatewayMetrics, TelemetryRecorder};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    size_guard: SizeGuard,
    rate_limiter: SlidingWindowLimiter,
    governor: Arc<InflightGovernor>,
    telemetry: TelemetryRecorder,
    metrics: GatewayMetrics,
    engine_runner: EngineRunner,
    started_at: Instant,
}

impl AppState {
    /// Build state with process engines taken from `cfg.engine`.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        cfg.validate()?;
        let runner = EngineRunner::from_config(&cfg.engine);
        Ok(Self::with_runner(cfg, runner))
    }

    /// Build state around an already-assembled runner (tests inject fakes).
    pub fn with_runner(cfg: GatewayConfig, engine_runner: EngineRunner) -> Self {
        tracing::info!(
            max_body = cfg.limits.max_body_bytes,
            max_code = cfg.limits.max_code_bytes,
            max_context = cfg.limits.max_context_bytes,
            window_ms = cfg.rate_limit.window_ms,
            max_requests = cfg.rate_limit.max_requests,
            max_inflight = cfg.admission.max_inflight,
            fallback = ?engine_runner.fallback(),
            "gateway state ready"
        );
        Self {
            inner: Arc::new(AppStateInner {
                size_guard: SizeGuard::new(&cfg.limits),
                rate_limiter: SlidingWindowLimiter::new(&cfg.rate_limit),
                governor: InflightGovernor::new(cfg.admission.max_inflight),
                telemetry: TelemetryRecorder::new(),
                metrics: GatewayMetrics::default(),
                engine_runner,
                started_at: Instant::now(),
                cfg,
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn size_guard(&self) -> &SizeGuard {
        &self.inner.size_guard
    }

    pub fn rate_limiter(&self) -> &SlidingWindowLimiter {
        &self.inner.rate_limiter
    }

    pub fn governor(&self) -> &Arc<InflightGovernor> {
        &self.inner.governor
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.inner.telemetry
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }

    /// Owned handle so engine work can outlive the request future.
    pub fn engine_runner(&self) -> EngineRunner {
        self.inner.engine_runner.clone()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }

    /// Ready means not shutting down and at least one inflight slot free.
    pub fn is_ready(&self) -> bool {
        !self.is_draining() && !self.inner.governor.is_saturated()
    }
}
