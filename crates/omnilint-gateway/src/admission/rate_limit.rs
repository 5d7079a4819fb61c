//! Per-client sliding-window rate limiter.
//!
//! Each client key owns a queue of admission timestamps. On every request the
//! queue is pruned of entries older than the window; the request is admitted
//! only if fewer than `max_requests` remain, and only admitted requests are
//! recorded. Same-key access is serialized by the map's entry guard, so the
//! count for a key never exceeds `max_requests` within a window.
//!
//! Past `max_tracked_clients` keys, idle buckets are swept, at most once per
//! window. A map full of live clients therefore costs one full scan per
//! window instead of one per request.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimitSection;

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    window: Duration,
    max_requests: usize,
    max_tracked_clients: usize,
    buckets: DashMap<String, VecDeque<Instant>>,
    last_sweep: Mutex<Option<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(cfg: &RateLimitSection) -> Self {
        Self {
            window: Duration::from_millis(cfg.window_ms),
            max_requests: cfg.max_requests,
            max_tracked_clients: cfg.max_tracked_clients,
            buckets: DashMap::new(),
            last_sweep: Mutex::new(None),
        }
    }

    /// Admit or reject a request from `client` arriving now.
    pub fn admit(&self, client: &str) -> bool {
        self.admit_at(client, Instant::now())
    }

    /// Admit or reject a request from `client` arriving at `now`.
    pub fn admit_at(&self, client: &str, now: Instant) -> bool {
        let admitted = {
            let mut bucket = self.buckets.entry(client.to_owned()).or_default();
            prune(&mut bucket, now, self.window);
            if bucket.len() >= self.max_requests {
                false
            } else {
                bucket.push_back(now);
                true
            }
        };

        if self.buckets.len() > self.max_tracked_clients && self.sweep_due(now) {
            let removed = self.sweep(now);
            tracing::debug!(removed, len = self.buckets.len(), "rate limit buckets swept");
        }

        admitted
    }

    /// Claims the sweep slot when none ran within the last window.
    fn sweep_due(&self, now: Instant) -> bool {
        let mut last = self
            .last_sweep
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let due = last.map_or(true, |at| now.saturating_duration_since(at) >= self.window);
        if due {
            *last = Some(now);
        }
        due
    }

    /// Drop buckets with no timestamps left in the window. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            prune(bucket, now, self.window);
            !bucket.is_empty()
        });
        before.saturating_sub(self.buckets.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    /// Forget every client.
    pub fn reset(&self) {
        self.buckets.clear();
        let mut last = self
            .last_sweep
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = None;
    }
}

fn prune(bucket: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    let Some(window_start) = now.checked_sub(window) else {
        return;
    };
    while bucket.front().is_some_and(|ts| *ts < window_start) {
        bucket.pop_front();
    }
}
