//! Transport layer (HTTP).
//!
//! Exposes the validation handler and the codec that decodes request bodies
//! once before they reach the pipeline.

pub mod codec;
pub mod http;
