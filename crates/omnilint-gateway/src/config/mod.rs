//! Gateway config loader.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. optional YAML file named by `OMNILINT_CONFIG` (strict parsing)
//! 3. environment overrides (`VALIDATE_*`, `DISABLE_ENGINE_FALLBACK`, ...)

pub mod schema;

use std::fs;
use std::str::FromStr;

use omnilint_core::error::{OmniLintError, Result};

pub use schema::{
    AdmissionSection, EngineCommand, EngineSection, GatewayConfig, GatewaySection, LimitsSection,
    RateLimitSection,
};

/// Env var naming an optional YAML config file.
pub const CONFIG_PATH_ENV: &str = "OMNILINT_CONFIG";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| OmniLintError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| OmniLintError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load from the process environment.
pub fn load_from_env() -> Result<GatewayConfig> {
    load_with(|key| std::env::var(key).ok())
}

/// Load using an arbitrary variable lookup (tests pass a map).
pub fn load_with<F>(lookup: F) -> Result<GatewayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match lookup(CONFIG_PATH_ENV) {
        Some(path) if !path.trim().is_empty() => load_from_file(path.trim())?,
        _ => GatewayConfig::default(),
    };
    apply_env_overrides(&mut cfg, &lookup)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Overlay environment values onto an existing config.
pub fn apply_env_overrides<F>(cfg: &mut GatewayConfig, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("OMNILINT_LISTEN") {
        cfg.gateway.listen = v;
    }
    if let Some(v) = lookup("BUILD_VERSION") {
        cfg.gateway.build_version = v;
    }
    override_num(lookup, "VALIDATE_BODY_MAX", &mut cfg.limits.max_body_bytes)?;
    override_num(lookup, "VALIDATE_CODE_MAX", &mut cfg.limits.max_code_bytes)?;
    override_num(lookup, "VALIDATE_CONTEXT_MAX", &mut cfg.limits.max_context_bytes)?;
    override_num(lookup, "VALIDATE_RATE_LIMIT_WINDOW_MS", &mut cfg.rate_limit.window_ms)?;
    override_num(lookup, "VALIDATE_RATE_LIMIT_MAX", &mut cfg.rate_limit.max_requests)?;
    override_num(lookup, "VALIDATE_MAX_INFLIGHT", &mut cfg.admission.max_inflight)?;
    override_num(lookup, "ENGINE_TIMEOUT_MS", &mut cfg.engine.timeout_ms)?;
    if let Some(v) = lookup("DISABLE_ENGINE_FALLBACK") {
        cfg.engine.disable_fallback = v.trim().eq_ignore_ascii_case("true");
    }
    Ok(())
}

fn override_num<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| OmniLintError::BadRequest(format!("{key}={raw:?}: {e}")))?;
    }
    Ok(())
}
