//! Out-of-process engine.
//!
//! Each run gets its own `omnilint-*` temp directory holding `input.omni`
//! (and `context.json` when the engine takes a context). The directory is
//! removed on every exit path; `TempDir` drop covers early returns. A child
//! that overruns its output ceiling or its timeout is killed on the spot and
//! whatever it wrote so far is kept.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use omnilint_core::protocol::trace::extract_actions;

use super::{EngineFailure, EngineOutcome, PolicyEngine};
use crate::config::{EngineCommand, EngineSection};

const POLICY_FILE: &str = "input.omni";
const CONTEXT_FILE: &str = "context.json";

pub struct ProcessEngine {
    cmd: EngineCommand,
    timeout: Duration,
    max_output_bytes: usize,
}

impl ProcessEngine {
    pub fn new(cmd: EngineCommand, timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            cmd,
            timeout,
            max_output_bytes,
        }
    }

    pub fn from_config(cmd: &EngineCommand, section: &EngineSection) -> Self {
        Self::new(
            cmd.clone(),
            Duration::from_millis(section.timeout_ms),
            section.max_output_bytes,
        )
    }

    async fn execute(&self, policy_path: &Path, context_path: Option<&Path>) -> EngineOutcome {
        let mut cmd = Command::new(&self.cmd.program);
        cmd.args(&self.cmd.args).arg(policy_path);
        if let (Some(flag), Some(ctx)) = (&self.cmd.context_flag, context_path) {
            cmd.arg(flag).arg(ctx);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => return EngineOutcome::failed(EngineFailure::Spawn(e.to_string())),
        };

        let cap = self.max_output_bytes;
        let mut out = Capture::new(child.stdout.take(), cap);
        let mut err = Capture::new(child.stderr.take(), cap);
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        // Read both pipes until they close. Going over the ceiling or past the
        // deadline stops reading and kills the child right away.
        let mut stopped = loop {
            if out.truncated || err.truncated {
                break Some(EngineFailure::OutputTooLarge);
            }
            if out.done() && err.done() {
                break None;
            }
            let read = tokio::select! {
                r = out.read_chunk(), if !out.done() => r,
                r = err.read_chunk(), if !err.done() => r,
                _ = &mut deadline => break Some(EngineFailure::Timeout),
            };
            if let Err(e) = read {
                break Some(EngineFailure::Io(e.to_string()));
            }
        };

        let mut status = None;
        if stopped.is_none() {
            tokio::select! {
                s = child.wait() => match s {
                    Ok(s) => status = Some(s),
                    Err(e) => stopped = Some(EngineFailure::Io(e.to_string())),
                },
                _ = &mut deadline => stopped = Some(EngineFailure::Timeout),
            }
        }

        let stdout = String::from_utf8_lossy(&out.bytes).into_owned();
        let mut stderr = String::from_utf8_lossy(&err.bytes).into_owned();

        let failure = match (stopped, status) {
            (Some(failure), _) => {
                if let Err(e) = child.start_kill() {
                    tracing::debug!(engine = %self.cmd.name, error = %e, failure = failure.label(), "engine kill failed");
                }
                if !stderr.is_empty() && !stderr.ends_with('\n') {
                    stderr.push('\n');
                }
                stderr.push_str(&failure.to_string());
                Some(failure)
            }
            (None, Some(status)) if !status.success() => {
                let code = status.code();
                Some(EngineFailure::Exit {
                    code,
                    policy: code.is_some_and(|c| self.cmd.policy_error_exit_codes.contains(&c)),
                })
            }
            (None, _) => None,
        };

        let actions = if failure.is_none() || !stdout.is_empty() {
            extract_actions(&stdout)
        } else {
            extract_actions(&stderr)
        };

        EngineOutcome {
            stdout,
            stderr,
            actions,
            failure,
        }
    }
}

#[async_trait]
impl PolicyEngine for ProcessEngine {
    fn name(&self) -> &str {
        &self.cmd.name
    }

    async fn run(&self, code: &str, context: Option<&str>) -> EngineOutcome {
        let workspace = match tempfile::Builder::new().prefix("omnilint-").tempdir() {
            Ok(dir) => dir,
            Err(e) => return EngineOutcome::failed(EngineFailure::Workspace(e.to_string())),
        };

        let policy_path = workspace.path().join(POLICY_FILE);
        if let Err(e) = tokio::fs::write(&policy_path, code).await {
            return EngineOutcome::failed(EngineFailure::Workspace(e.to_string()));
        }

        let context_path = match context.filter(|c| !c.trim().is_empty()) {
            Some(ctx) if self.cmd.context_flag.is_some() => {
                let path = workspace.path().join(CONTEXT_FILE);
                if let Err(e) = tokio::fs::write(&path, ctx).await {
                    return EngineOutcome::failed(EngineFailure::Workspace(e.to_string()));
                }
                Some(path)
            }
            _ => None,
        };

        let outcome = self.execute(&policy_path, context_path.as_deref()).await;

        let dir = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            tracing::warn!(engine = %self.cmd.name, dir = %dir.display(), error = %e, "engine workspace cleanup failed");
        }
        outcome
    }
}

const READ_CHUNK: usize = 8 * 1024;

/// One child pipe, captured up to `cap` bytes.
struct Capture<R> {
    stream: Option<R>,
    bytes: Vec<u8>,
    cap: usize,
    truncated: bool,
}

impl<R> Capture<R>
where
    R: AsyncRead + Unpin,
{
    fn new(stream: Option<R>, cap: usize) -> Self {
        Self {
            stream,
            bytes: Vec::new(),
            cap,
            truncated: false,
        }
    }

    fn done(&self) -> bool {
        self.stream.is_none()
    }

    /// Cancel-safe: a dropped call loses no bytes, since `read` only
    /// consumes what it returns.
    async fn read_chunk(&mut self) -> std::io::Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        let mut buf = [0u8; READ_CHUNK];
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            self.stream = None;
            return Ok(());
        }
        let room = self.cap.saturating_sub(self.bytes.len());
        if n > room {
            self.bytes.extend_from_slice(&buf[..room]);
            self.truncated = true;
        } else {
            self.bytes.extend_from_slice(&buf[..n]);
        }
        Ok(())
    }
}
