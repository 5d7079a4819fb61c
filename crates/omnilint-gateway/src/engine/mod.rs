//! Evaluation engines.
//!
//! An engine turns lint-clean policy text (plus optional context JSON) into a
//! decision trace. Engines are opaque: the gateway only sees their text output
//! and scans it for action markers. [`runner::EngineRunner`] owns the
//! primary/secondary selection.

pub mod process;
pub mod runner;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

pub use process::ProcessEngine;
pub use runner::{EngineRunner, FallbackPolicy};

/// Why a single engine attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineFailure {
    /// Temporary workspace could not be prepared.
    Workspace(String),
    /// Process could not be started.
    Spawn(String),
    /// Did not finish within the configured timeout (process killed).
    Timeout,
    /// A captured stream went over the output ceiling.
    OutputTooLarge,
    /// Reading the engine's output or status failed.
    Io(String),
    /// Non-zero exit. `policy` is true when the exit code means the policy
    /// itself was rejected by the engine.
    Exit { code: Option<i32>, policy: bool },
}

impl EngineFailure {
    /// Tooling failures are eligible for fallback; policy-content failures are not.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, EngineFailure::Exit { policy: true, .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            EngineFailure::Workspace(_) => "workspace",
            EngineFailure::Spawn(_) => "spawn",
            EngineFailure::Timeout => "timeout",
            EngineFailure::OutputTooLarge => "output_too_large",
            EngineFailure::Io(_) => "io",
            EngineFailure::Exit { policy: true, .. } => "policy_error",
            EngineFailure::Exit { policy: false, .. } => "exit",
        }
    }
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineFailure::Workspace(e) => write!(f, "workspace setup failed: {e}"),
            EngineFailure::Spawn(e) => write!(f, "engine spawn failed: {e}"),
            EngineFailure::Timeout => f.write_str("engine timed out"),
            EngineFailure::OutputTooLarge => f.write_str("engine output exceeded ceiling"),
            EngineFailure::Io(e) => write!(f, "engine io failed: {e}"),
            EngineFailure::Exit { code: Some(c), .. } => write!(f, "engine exited with status {c}"),
            EngineFailure::Exit { code: None, .. } => f.write_str("engine terminated by signal"),
        }
    }
}

/// Result of one engine attempt.
#[derive(Debug, Clone, Default)]
pub struct EngineOutcome {
    pub stdout: String,
    pub stderr: String,
    pub actions: Vec<String>,
    pub failure: Option<EngineFailure>,
}

impl EngineOutcome {
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }

    /// Outcome for an attempt that never produced output.
    pub fn failed(failure: EngineFailure) -> Self {
        Self {
            stderr: failure.to_string(),
            failure: Some(failure),
            ..Self::default()
        }
    }
}

/// One way of executing a policy.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, code: &str, context: Option<&str>) -> EngineOutcome;
}

/// Which engine produced the surfaced result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineTag {
    Primary,
    Secondary,
    None,
}

impl EngineTag {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineTag::Primary => "primary",
            EngineTag::Secondary => "secondary",
            EngineTag::None => "none",
        }
    }
}

/// What the pipeline reports back to the caller.
#[derive(Debug, Clone)]
pub struct EngineResult {
    pub stdout: String,
    pub stderr: String,
    pub actions: Vec<String>,
    pub engine: EngineTag,
    /// Output and actions are unreliable; surfaced for diagnostics only.
    pub error: bool,
}

impl EngineResult {
    pub fn from_outcome(outcome: EngineOutcome, engine: EngineTag) -> Self {
        Self {
            error: !outcome.is_ok(),
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            actions: outcome.actions,
            engine,
        }
    }
}
