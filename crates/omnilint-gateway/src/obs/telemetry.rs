//! Aggregate request telemetry.
//!
//! One mutex guards all counters so a snapshot is always internally
//! consistent (e.g. `total_duration_ms` matches `total_requests`). No
//! per-request identity is retained.

use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub total_rate_limited: u64,
    pub total_parse_errors: u64,
    pub total_duration_ms: u64,
    /// Unix epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_request_at: Option<u64>,
    /// Unix epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_at: Option<u64>,
}

impl TelemetrySnapshot {
    pub fn avg_latency_ms(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.total_duration_ms as f64 / self.total_requests as f64
    }
}

#[derive(Debug, Default)]
pub struct TelemetryRecorder {
    inner: Mutex<TelemetrySnapshot>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A request ran to a 200 response (clean, dirty lint, or engine failure).
    pub fn record_request(&self, duration_ms: u64) {
        let mut c = self.lock();
        c.total_requests = c.total_requests.saturating_add(1);
        c.total_duration_ms = c.total_duration_ms.saturating_add(duration_ms);
        c.last_request_at = Some(now_ms());
    }

    pub fn record_error(&self) {
        let mut c = self.lock();
        c.total_errors = c.total_errors.saturating_add(1);
        c.last_error_at = Some(now_ms());
    }

    /// Any admission rejection: payload size, rate limit, or busy.
    pub fn record_rate_limited(&self) {
        let mut c = self.lock();
        c.total_rate_limited = c.total_rate_limited.saturating_add(1);
    }

    /// Lint errors or invalid context.
    pub fn record_parse_error(&self) {
        let mut c = self.lock();
        c.total_parse_errors = c.total_parse_errors.saturating_add(1);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.lock().clone()
    }

    /// Zero everything. Test isolation only.
    pub fn reset(&self) {
        *self.lock() = TelemetrySnapshot::default();
    }

    // Counters stay meaningful after a panic elsewhere; recover the guard.
    fn lock(&self) -> MutexGuard<'_, TelemetrySnapshot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
