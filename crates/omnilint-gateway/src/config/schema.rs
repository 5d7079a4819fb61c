use serde::Deserialize;
use omnilint_core::error::{OmniLintError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub limits: LimitsSection,

    #[serde(default)]
    pub rate_limit: RateLimitSection,

    #[serde(default)]
    pub admission: AdmissionSection,

    #[serde(default)]
    pub engine: EngineSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        self.rate_limit.validate()?;
        self.admission.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Reported by the readiness endpoint.
    #[serde(default = "default_build_version")]
    pub build_version: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            build_version: default_build_version(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_build_version() -> String {
    "unknown".into()
}

/// Payload ceilings in bytes. A payload exactly at the ceiling is accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsSection {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default = "default_max_code_bytes")]
    pub max_code_bytes: usize,

    #[serde(default = "default_max_context_bytes")]
    pub max_context_bytes: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            max_code_bytes: default_max_code_bytes(),
            max_context_bytes: default_max_context_bytes(),
        }
    }
}

impl LimitsSection {
    pub fn validate(&self) -> Result<()> {
        if self.max_body_bytes == 0 || self.max_code_bytes == 0 || self.max_context_bytes == 0 {
            return Err(OmniLintError::BadRequest(
                "limits.* must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_body_bytes() -> usize {
    200_000
}
fn default_max_code_bytes() -> usize {
    100_000
}
fn default_max_context_bytes() -> usize {
    100_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSection {
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Admitted requests per client per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Above this many tracked clients, empty buckets are swept.
    #[serde(default = "default_max_tracked_clients")]
    pub max_tracked_clients: usize,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_requests: default_max_requests(),
            max_tracked_clients: default_max_tracked_clients(),
        }
    }
}

impl RateLimitSection {
    pub fn validate(&self) -> Result<()> {
        if self.window_ms == 0 {
            return Err(OmniLintError::BadRequest(
                "rate_limit.window_ms must be greater than 0".into(),
            ));
        }
        if self.max_requests == 0 {
            return Err(OmniLintError::BadRequest(
                "rate_limit.max_requests must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_window_ms() -> u64 {
    60_000
}
fn default_max_requests() -> usize {
    30
}
fn default_max_tracked_clients() -> usize {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdmissionSection {
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
}

impl Default for AdmissionSection {
    fn default() -> Self {
        Self {
            max_inflight: default_max_inflight(),
        }
    }
}

impl AdmissionSection {
    pub fn validate(&self) -> Result<()> {
        if self.max_inflight == 0 {
            return Err(OmniLintError::BadRequest(
                "admission.max_inflight must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_inflight() -> usize {
    4
}

/// How to launch one evaluation engine.
///
/// The engine is invoked as `<program> <args...> <policy path>` followed by
/// `<context_flag> <context path>` when a context is supplied and the engine
/// accepts one.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineCommand {
    pub name: String,
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub context_flag: Option<String>,

    /// Exit codes meaning "the policy itself failed" rather than a tooling
    /// failure. These never trigger the fallback engine.
    #[serde(default)]
    pub policy_error_exit_codes: Vec<i32>,
}

impl EngineCommand {
    fn validate(&self, field: &str) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(OmniLintError::BadRequest(format!(
                "{field}.program must not be empty"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    #[serde(default = "default_primary")]
    pub primary: EngineCommand,

    #[serde(default = "default_secondary")]
    pub secondary: Option<EngineCommand>,

    #[serde(default = "default_engine_timeout_ms")]
    pub timeout_ms: u64,

    /// Per-stream capture ceiling.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    #[serde(default)]
    pub disable_fallback: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            timeout_ms: default_engine_timeout_ms(),
            max_output_bytes: default_max_output_bytes(),
            disable_fallback: false,
        }
    }
}

impl EngineSection {
    pub fn validate(&self) -> Result<()> {
        self.primary.validate("engine.primary")?;
        if let Some(secondary) = &self.secondary {
            secondary.validate("engine.secondary")?;
        }
        if self.timeout_ms == 0 {
            return Err(OmniLintError::BadRequest(
                "engine.timeout_ms must be greater than 0".into(),
            ));
        }
        if self.max_output_bytes == 0 {
            return Err(OmniLintError::BadRequest(
                "engine.max_output_bytes must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_primary() -> EngineCommand {
    EngineCommand {
        name: "omnilang".into(),
        program: "omnilang".into(),
        args: vec!["exec".into()],
        context_flag: Some("--context".into()),
        policy_error_exit_codes: Vec::new(),
    }
}
fn default_secondary() -> Option<EngineCommand> {
    Some(EngineCommand {
        name: "omnilang-proto".into(),
        program: "omnilang-proto".into(),
        args: Vec::new(),
        context_flag: None,
        policy_error_exit_codes: Vec::new(),
    })
}
fn default_engine_timeout_ms() -> u64 {
    5_000
}
fn default_max_output_bytes() -> usize {
    2 * 1024 * 1024
}
