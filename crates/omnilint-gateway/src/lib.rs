//! OmniLint gateway library entry.
//!
//! This crate wires admission control, the linting pipeline, the evaluation
//! engines, and observability into an axum service. It is intended to be
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod admission;
pub mod app_state;
pub mod config;
pub mod context;
pub mod engine;
pub mod obs;
pub mod ops;
pub mod pipeline;
pub mod router;
pub mod transport;
