//! Per-request context types shared across layers.
//!
//! Client identity is resolved once from proxy headers so admission and
//! logging agree on who the caller is without coupling to axum extractors.

pub mod client;

pub use client::{client_key, RequestMeta, LOCAL_CLIENT};
