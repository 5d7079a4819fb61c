//! Shared error type across omnilint crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Body, policy or context above its ceiling.
    PayloadTooLarge,
    /// Per-client window exhausted.
    RateLimited,
    /// Inflight governor full.
    Busy,
    /// Context field is not a JSON object or array.
    InvalidContext,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::RateLimited => "RATE_LIMITED",
            ClientCode::Busy => "BUSY",
            ClientCode::InvalidContext => "INVALID_CONTEXT",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Which size ceiling a payload broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Body,
    Code,
    Context,
}

impl PayloadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadKind::Body => "body",
            PayloadKind::Code => "code",
            PayloadKind::Context => "context",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, OmniLintError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum OmniLintError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("{} too large", .0.as_str())]
    PayloadTooLarge(PayloadKind),
    #[error("rate limited")]
    RateLimited,
    #[error("server busy")]
    Busy,
    #[error("invalid context: {0}")]
    InvalidContext(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl OmniLintError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            OmniLintError::BadRequest(_) => ClientCode::BadRequest,
            OmniLintError::PayloadTooLarge(_) => ClientCode::PayloadTooLarge,
            OmniLintError::RateLimited => ClientCode::RateLimited,
            OmniLintError::Busy => ClientCode::Busy,
            OmniLintError::InvalidContext(_) => ClientCode::InvalidContext,
            OmniLintError::Internal(_) => ClientCode::Internal,
        }
    }

    /// True for rejections issued before any linting work (size, rate, busy).
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            OmniLintError::PayloadTooLarge(_) | OmniLintError::RateLimited | OmniLintError::Busy
        )
    }
}
