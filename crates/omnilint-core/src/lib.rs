//! omnilint core: transport-agnostic linting primitives, error types, and
//! engine trace parsing.
//!
//! This crate owns the OmniLang section grammar linter, the lenient rule
//! extractor, and the action-marker parser used on engine output. It carries
//! no HTTP or runtime dependencies so it can be reused by the gateway, CLIs,
//! and editor tooling alike.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Hostile policy text must surface as diagnostics, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod lint;
pub mod protocol;

/// Shared result type.
pub use error::{OmniLintError, Result};
pub use lint::{extract_rules, lint, RuleSummary, ValidationError};
