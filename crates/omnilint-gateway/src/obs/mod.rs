//! In-process observability.
//!
//! - [`telemetry`]: the aggregate counters served by the metrics endpoints.
//! - [`metrics`]: labelled counters/histograms rendered in Prometheus text format.

pub mod metrics;
pub mod telemetry;

pub use metrics::GatewayMetrics;
pub use telemetry::{TelemetryRecorder, TelemetrySnapshot};
