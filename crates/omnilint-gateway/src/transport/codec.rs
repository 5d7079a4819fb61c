//! Decode-once request codec.
//!
//! The body is decoded exactly once, after size and admission checks. The
//! context travels as a string and is only checked for shape here; engines
//! receive it verbatim.

use serde::Deserialize;
use serde_json::Value;

use omnilint_core::error::{OmniLintError, Result};

/// `POST /api/validate` body. Unknown fields are ignored; a missing or
/// `null` field reads as absent.
#[derive(Debug, Default, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

impl ValidateRequest {
    /// Policy text; absent means an empty document.
    pub fn code(&self) -> &str {
        self.code.as_deref().unwrap_or_default()
    }

    /// Context worth handing to an engine (non-blank).
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Empty body or a JSON `null` decodes to an empty request.
///
/// A body that is not a request object is an internal failure of the
/// validation call, not a lint result.
pub fn decode_request(raw: &[u8]) -> Result<ValidateRequest> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(ValidateRequest::default());
    }
    serde_json::from_slice::<Option<ValidateRequest>>(raw)
        .map(Option::unwrap_or_default)
        .map_err(|e| OmniLintError::Internal(format!("invalid request json: {e}")))
}

/// Context must be a JSON object or array.
pub fn check_context(ctx: &str) -> Result<()> {
    let parsed: Value =
        serde_json::from_str(ctx).map_err(|e| OmniLintError::InvalidContext(e.to_string()))?;
    if !(parsed.is_object() || parsed.is_array()) {
        return Err(OmniLintError::InvalidContext(
            "Context must be a JSON object or array.".into(),
        ));
    }
    Ok(())
}
