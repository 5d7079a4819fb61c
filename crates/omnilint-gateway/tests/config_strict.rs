#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;

use omnilint_gateway::config;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
gateway:
  listen: "0.0.0.0:8080"
limits:
  max_bodyy_bytes: 123 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("{}").expect("must parse");
    assert_eq!(cfg.gateway.listen, "0.0.0.0:8080");
    assert_eq!(cfg.gateway.build_version, "unknown");
    assert_eq!(cfg.limits.max_body_bytes, 200_000);
    assert_eq!(cfg.limits.max_code_bytes, 100_000);
    assert_eq!(cfg.limits.max_context_bytes, 100_000);
    assert_eq!(cfg.rate_limit.window_ms, 60_000);
    assert_eq!(cfg.rate_limit.max_requests, 30);
    assert_eq!(cfg.admission.max_inflight, 4);
    assert_eq!(cfg.engine.timeout_ms, 5_000);
    assert!(!cfg.engine.disable_fallback);
    assert_eq!(cfg.engine.primary.program, "omnilang");
    assert_eq!(cfg.engine.primary.context_flag.as_deref(), Some("--context"));
    assert!(cfg.engine.secondary.is_some());
}

#[test]
fn engine_commands_from_yaml() {
    let yaml = r#"
engine:
  primary:
    name: "fast"
    program: "/usr/local/bin/omni"
    args: ["run", "--quiet"]
    policy_error_exit_codes: [2]
  secondary: null
  timeout_ms: 250
"#;
    let cfg = config::load_from_str(yaml).expect("must parse");
    assert_eq!(cfg.engine.primary.name, "fast");
    assert_eq!(cfg.engine.primary.args, vec!["run", "--quiet"]);
    assert!(cfg.engine.primary.context_flag.is_none());
    assert_eq!(cfg.engine.primary.policy_error_exit_codes, vec![2]);
    assert!(cfg.engine.secondary.is_none());
    assert_eq!(cfg.engine.timeout_ms, 250);
}

#[test]
fn zero_limits_are_rejected() {
    for yaml in [
        "limits: { max_code_bytes: 0 }",
        "rate_limit: { window_ms: 0 }",
        "rate_limit: { max_requests: 0 }",
        "admission: { max_inflight: 0 }",
        "engine: { timeout_ms: 0 }",
    ] {
        let err = config::load_from_str(yaml).expect_err(yaml);
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST", "{yaml}");
    }
}

#[test]
fn empty_engine_program_is_rejected() {
    let yaml = r#"
engine:
  primary: { name: "p", program: "  " }
"#;
    let err = config::load_from_str(yaml).expect_err("must fail");
    assert!(err.to_string().contains("engine.primary.program"));
}

#[test]
fn env_overrides_apply_over_defaults() {
    let cfg = config::load_with(env(&[
        ("VALIDATE_BODY_MAX", "1024"),
        ("VALIDATE_CODE_MAX", "512"),
        ("VALIDATE_CONTEXT_MAX", "256"),
        ("VALIDATE_RATE_LIMIT_WINDOW_MS", "1000"),
        ("VALIDATE_RATE_LIMIT_MAX", " 2 "),
        ("VALIDATE_MAX_INFLIGHT", "1"),
        ("ENGINE_TIMEOUT_MS", "100"),
        ("DISABLE_ENGINE_FALLBACK", "TRUE"),
        ("BUILD_VERSION", "1.2.3"),
        ("OMNILINT_LISTEN", "127.0.0.1:9000"),
    ]))
    .expect("must load");

    assert_eq!(cfg.limits.max_body_bytes, 1024);
    assert_eq!(cfg.limits.max_code_bytes, 512);
    assert_eq!(cfg.limits.max_context_bytes, 256);
    assert_eq!(cfg.rate_limit.window_ms, 1000);
    assert_eq!(cfg.rate_limit.max_requests, 2);
    assert_eq!(cfg.admission.max_inflight, 1);
    assert_eq!(cfg.engine.timeout_ms, 100);
    assert!(cfg.engine.disable_fallback);
    assert_eq!(cfg.gateway.build_version, "1.2.3");
    assert_eq!(cfg.gateway.listen, "127.0.0.1:9000");
}

#[test]
fn fallback_flag_only_disables_on_true() {
    let cfg = config::load_with(env(&[("DISABLE_ENGINE_FALLBACK", "1")])).unwrap();
    assert!(!cfg.engine.disable_fallback);
}

#[test]
fn unparseable_env_number_is_an_error() {
    let err = config::load_with(env(&[("VALIDATE_RATE_LIMIT_MAX", "lots")])).expect_err("must fail");
    assert!(err.to_string().contains("VALIDATE_RATE_LIMIT_MAX"));
}

#[test]
fn env_values_are_validated() {
    let err = config::load_with(env(&[("VALIDATE_MAX_INFLIGHT", "0")])).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn config_file_then_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("omnilint.yaml");
    std::fs::write(&path, "rate_limit: { max_requests: 5 }\nadmission: { max_inflight: 8 }\n").unwrap();

    let cfg = config::load_with(env(&[
        (config::CONFIG_PATH_ENV, path.to_str().unwrap()),
        ("VALIDATE_MAX_INFLIGHT", "2"),
    ]))
    .unwrap();
    assert_eq!(cfg.rate_limit.max_requests, 5);
    assert_eq!(cfg.admission.max_inflight, 2);
}
