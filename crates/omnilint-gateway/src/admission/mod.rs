//! Admission control (size guard, per-client rate limit, inflight cap).
//!
//! Everything here runs before a request body is decoded or linted. Each
//! guard is a small service owning its own state and exposing only atomic
//! operations, so handlers never touch shared counters directly.

pub mod inflight;
pub mod rate_limit;
pub mod size;

pub use inflight::{InflightGovernor, InflightPermit};
pub use rate_limit::SlidingWindowLimiter;
pub use size::SizeGuard;
