use omnilint_core::error::{OmniLintError, PayloadKind, Result};

use crate::config::LimitsSection;

/// Byte ceilings for body, policy code, and context.
#[derive(Debug, Clone, Copy)]
pub struct SizeGuard {
    max_body: usize,
    max_code: usize,
    max_context: usize,
}

impl SizeGuard {
    pub fn new(limits: &LimitsSection) -> Self {
        Self {
            max_body: limits.max_body_bytes,
            max_code: limits.max_code_bytes,
            max_context: limits.max_context_bytes,
        }
    }

    /// Buffer size for reading a body: one byte over the ceiling is enough to
    /// tell "at limit" from "over limit".
    pub fn body_read_limit(&self) -> usize {
        self.max_body.saturating_add(1)
    }

    pub fn check_body(&self, len: usize) -> Result<()> {
        check(PayloadKind::Body, len, self.max_body)
    }

    pub fn check_code(&self, code: &str) -> Result<()> {
        check(PayloadKind::Code, code.len(), self.max_code)
    }

    pub fn check_context(&self, context: &str) -> Result<()> {
        check(PayloadKind::Context, context.len(), self.max_context)
    }
}

fn check(kind: PayloadKind, len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(OmniLintError::PayloadTooLarge(kind));
    }
    Ok(())
}
