//! Validation request pipeline.
//!
//! Received -> SizeChecked -> RateChecked -> Admitted -> Decoded -> Linted
//! -> (ContextChecked) -> Executed -> Recorded -> Responded
//!
//! Admission failures (size, rate, busy) end the request before any linting.
//! A dirty lint or a bad context ends it before any engine runs. Engine
//! failures are still a 200: the caller sees which engine ran and its
//! stderr. Only unexpected failures surface as 500.

pub mod response;

use std::time::Instant;

use axum::extract::rejection::{BytesRejection, FailedToBufferBody};
use bytes::Bytes;

use omnilint_core::error::{ClientCode, OmniLintError, PayloadKind, Result};
use omnilint_core::{extract_rules, lint, ValidationError};

use crate::app_state::AppState;
use crate::context::RequestMeta;
use crate::engine::EngineTag;
use crate::transport::codec::{check_context, decode_request};

pub use response::ValidateResponse;

/// Pipeline result: the body plus the error class that decided the status.
#[derive(Debug)]
pub struct Reply {
    /// `None` for every 200 response, including lint and engine failures.
    pub code: Option<ClientCode>,
    pub body: ValidateResponse,
}

/// Drive one request through the pipeline.
pub async fn validate(
    app: &AppState,
    meta: &RequestMeta,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Reply {
    let started = Instant::now();
    match run(app, meta, body, started).await {
        Ok(body) => Reply { code: None, body },
        Err(err) => reject(app, meta, err, started),
    }
}

async fn run(
    app: &AppState,
    meta: &RequestMeta,
    body: std::result::Result<Bytes, BytesRejection>,
    started: Instant,
) -> Result<ValidateResponse> {
    let guard = app.size_guard();

    // Buffered under a limit one byte past the ceiling; never JSON-decoded if over.
    let raw = body.map_err(read_failure)?;
    guard.check_body(raw.len())?;

    if !app.rate_limiter().admit(&meta.client) {
        return Err(OmniLintError::RateLimited);
    }

    let permit = app.governor().try_begin().ok_or(OmniLintError::Busy)?;

    let req = decode_request(&raw)?;
    guard.check_code(req.code())?;
    guard.check_context(req.context.as_deref().unwrap_or_default())?;

    let errors = lint(req.code());
    let rules = extract_rules(req.code());

    if !errors.is_empty() {
        let duration_ms = elapsed_ms(started);
        app.telemetry().record_parse_error();
        app.telemetry().record_request(duration_ms);
        observe(app, "lint_errors", started);
        tracing::info!(
            errors = errors.len(),
            rules = rules.len(),
            duration_ms,
            "validate.parse_errors"
        );
        return Ok(ValidateResponse::not_executed(
            &meta.request_id,
            errors,
            rules,
            duration_ms,
        ));
    }

    if let Some(ctx) = req.context() {
        if let Err(err) = check_context(ctx) {
            let duration_ms = elapsed_ms(started);
            app.telemetry().record_parse_error();
            app.telemetry().record_request(duration_ms);
            observe(app, "invalid_context", started);
            tracing::warn!(error = %err, duration_ms, "validate.invalid_context_json");
            let message = response::client_message(&err);
            return Ok(ValidateResponse::not_executed(
                &meta.request_id,
                vec![ValidationError::document(message)],
                rules,
                duration_ms,
            ));
        }
    }

    // The permit rides with the engine task so the slot stays taken for as
    // long as the process runs, even if the caller goes away.
    let runner = app.engine_runner();
    let code = req.code().to_owned();
    let context = req.context().map(str::to_owned);
    let result = tokio::spawn(async move {
        let _permit = permit;
        runner.run(&code, context.as_deref()).await
    })
    .await
    .map_err(|e| OmniLintError::Internal(format!("engine task failed: {e}")))?;

    let duration_ms = elapsed_ms(started);
    app.telemetry().record_request(duration_ms);
    app.metrics().engine_runs.inc(&[
        ("engine", result.engine.as_str()),
        ("outcome", if result.error { "error" } else { "ok" }),
    ]);
    observe(app, "executed", started);
    tracing::info!(
        engine = result.engine.as_str(),
        fallback = result.engine == EngineTag::Secondary,
        engine_error = result.error,
        actions = result.actions.len(),
        rules = rules.len(),
        duration_ms,
        "validate.complete"
    );

    Ok(ValidateResponse::executed(
        &meta.request_id,
        rules,
        result,
        duration_ms,
    ))
}

fn reject(app: &AppState, meta: &RequestMeta, err: OmniLintError, started: Instant) -> Reply {
    let duration_ms = elapsed_ms(started);
    let code = err.client_code();

    if err.is_admission() {
        let reason = match &err {
            OmniLintError::PayloadTooLarge(_) => "payload_too_large",
            OmniLintError::RateLimited => "rate_limited",
            _ => "busy",
        };
        app.telemetry().record_rate_limited();
        app.metrics().rejections.inc(&[("reason", reason)]);
        tracing::warn!(reason, error = %err, "validate.rejected");
    } else {
        app.telemetry().record_error();
        observe(app, "failed", started);
        tracing::error!(error = %err, "validate.error");
    }

    Reply {
        code: Some(code),
        body: ValidateResponse::rejected(&meta.request_id, &err, duration_ms),
    }
}

/// Only the length limit is a size rejection. Aborted or garbled transfers
/// are failures of the call itself.
fn read_failure(rejection: BytesRejection) -> OmniLintError {
    match rejection {
        BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_)) => {
            OmniLintError::PayloadTooLarge(PayloadKind::Body)
        }
        other => OmniLintError::Internal(format!("request body read failed: {other}")),
    }
}

fn observe(app: &AppState, outcome: &str, started: Instant) {
    app.metrics()
        .request_duration
        .observe(&[("outcome", outcome)], started.elapsed());
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
