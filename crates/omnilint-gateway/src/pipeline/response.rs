use serde::Serialize;

use omnilint_core::error::{OmniLintError, PayloadKind};
use omnilint_core::{RuleSummary, ValidationError};

use crate::engine::{EngineResult, EngineTag};

pub const MODE: &str = "validator";
pub const COMPILER: &str = "not-available";
pub const CAP_PARSE: &str = "parse";
pub const CAP_RUNTIME_EVAL: &str = "runtime-eval";

/// JSON body of every `/api/validate` response, success or not.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub errors: Vec<ValidationError>,
    pub rules: Vec<RuleSummary>,
    pub actions: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub engine: EngineTag,
    pub mode: &'static str,
    pub capabilities: Vec<&'static str>,
    pub compiler: &'static str,
    pub request_id: String,
    pub duration_ms: u64,
}

impl ValidateResponse {
    fn base(request_id: &str, duration_ms: u64) -> Self {
        Self {
            errors: Vec::new(),
            rules: Vec::new(),
            actions: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
            engine: EngineTag::None,
            mode: MODE,
            capabilities: Vec::new(),
            compiler: COMPILER,
            request_id: request_id.to_string(),
            duration_ms,
        }
    }

    /// Rejected or failed before linting produced anything.
    pub fn rejected(request_id: &str, error: &OmniLintError, duration_ms: u64) -> Self {
        let mut r = Self::base(request_id, duration_ms);
        r.errors.push(ValidationError::document(client_message(error)));
        r
    }

    /// Lint-level or context-level failure: nothing was executed.
    pub fn not_executed(
        request_id: &str,
        errors: Vec<ValidationError>,
        rules: Vec<RuleSummary>,
        duration_ms: u64,
    ) -> Self {
        let mut r = Self::base(request_id, duration_ms);
        r.errors = errors;
        r.rules = rules;
        r.capabilities = vec![CAP_PARSE];
        r
    }

    /// Lint-clean document handed to an engine.
    pub fn executed(
        request_id: &str,
        rules: Vec<RuleSummary>,
        result: EngineResult,
        duration_ms: u64,
    ) -> Self {
        let mut r = Self::base(request_id, duration_ms);
        r.rules = rules;
        r.actions = result.actions;
        r.stdout = result.stdout;
        r.stderr = result.stderr;
        r.engine = result.engine;
        r.capabilities = vec![CAP_PARSE, CAP_RUNTIME_EVAL];
        r
    }
}

/// Caller-facing text for a rejection. Internal detail never leaks.
pub fn client_message(error: &OmniLintError) -> String {
    match error {
        OmniLintError::PayloadTooLarge(PayloadKind::Body) => "Payload too large.".into(),
        OmniLintError::PayloadTooLarge(PayloadKind::Code) => "Policy too large.".into(),
        OmniLintError::PayloadTooLarge(PayloadKind::Context) => "Context JSON too large.".into(),
        OmniLintError::RateLimited => "Rate limit exceeded. Please retry later.".into(),
        OmniLintError::Busy => "Server busy. Please retry shortly.".into(),
        OmniLintError::BadRequest(_) => "Malformed request body.".into(),
        OmniLintError::InvalidContext(reason) => format!("Invalid context JSON: {reason}"),
        OmniLintError::Internal(_) => "Internal error during validation.".into(),
    }
}
