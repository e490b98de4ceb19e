//! Command-backed executor.
//!
//! Each job kind maps to an external program. One execution spawns one child
//! process: the derived job configuration goes in on stdin as JSON, the result
//! payload comes back on stdout.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use autofilm_core::{ExecutorError, JobConfig, JobKind};

use crate::tasks::{ExecutorFactory, JobExecutor, RunOptions};

/// Per-stream capture limit.
const MAX_OUTPUT_BYTES: u64 = 4 * 1024 * 1024;

/// Number of trailing stderr bytes kept in a failure message.
const STDERR_TAIL_BYTES: usize = 2048;

/// How to launch the program for one job kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Kill the child after this many seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout_secs: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// Production [`ExecutorFactory`]: one configured program per job kind.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutorFactory {
    commands: BTreeMap<JobKind, CommandSpec>,
}

impl CommandExecutorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, kind: JobKind, spec: CommandSpec) -> Self {
        self.commands.insert(kind, spec);
        self
    }

    pub fn command(&self, kind: JobKind) -> Option<&CommandSpec> {
        self.commands.get(&kind)
    }
}

impl FromIterator<(JobKind, CommandSpec)> for CommandExecutorFactory {
    fn from_iter<T: IntoIterator<Item = (JobKind, CommandSpec)>>(iter: T) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl ExecutorFactory for CommandExecutorFactory {
    fn build(
        &self,
        kind: JobKind,
        config: &JobConfig,
        options: &RunOptions,
    ) -> Result<Box<dyn JobExecutor>, ExecutorError> {
        let spec = self.command(kind).ok_or_else(|| {
            ExecutorError::invalid_config(format!("no executor program configured for {kind}"))
        })?;

        let mut payload = config.clone();
        if let Some(sync) = options.sync_mode {
            payload.insert("sync_server", sync);
        }
        if options.overwrite {
            payload.insert("overwrite", true);
        }

        let input = serde_json::to_vec(&payload)
            .map_err(|e| ExecutorError::invalid_config(e.to_string()))?;

        Ok(Box::new(CommandExecutor {
            kind,
            spec: spec.clone(),
            input,
        }))
    }
}

/// One child-process execution. Owns its serialized input.
#[derive(Debug)]
pub struct CommandExecutor {
    kind: JobKind,
    spec: CommandSpec,
    input: Vec<u8>,
}

#[async_trait]
impl JobExecutor for CommandExecutor {
    async fn run(&self, scope: Option<&str>) -> Result<JsonValue, ExecutorError> {
        let mut cmd = Command::new(&self.spec.program);
        cmd.args(&self.spec.args)
            .envs(&self.spec.env)
            .env("AUTOFILM_TASK_KIND", self.kind.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future (cancellation, timeout) kills the child.
            .kill_on_drop(true);
        if let Some(dir) = scope {
            cmd.arg("--scope").arg(dir);
        }

        debug!(program = %self.spec.program, kind = %self.kind, scope, "spawning executor process");
        let mut child = cmd
            .spawn()
            .map_err(|e| ExecutorError::Spawn(format!("{}: {e}", self.spec.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // The program may exit without reading its input.
            let _ = stdin.write_all(&self.input).await;
            drop(stdin);
        }

        let stdout = tokio::spawn(read_stream(child.stdout.take()));
        let stderr = tokio::spawn(read_stream(child.stderr.take()));

        let status = match self.spec.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), child.wait())
                .await
                .map_err(|_| ExecutorError::failed(format!("timed out after {secs}s")))?,
            None => child.wait().await,
        }
        .map_err(|e| ExecutorError::Spawn(e.to_string()))?;

        let stdout = stdout.await.unwrap_or_default();
        let stderr = stderr.await.unwrap_or_default();

        if !status.success() {
            let code = status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            let tail = stderr_tail(&stderr);
            return Err(ExecutorError::failed(if tail.is_empty() {
                format!("exited with status {code}")
            } else {
                format!("exited with status {code}: {tail}")
            }));
        }

        Ok(parse_output(&stdout))
    }
}

/// JSON stdout is the result; anything else is wrapped as a string.
fn parse_output(stdout: &[u8]) -> JsonValue {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return JsonValue::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| JsonValue::String(trimmed.to_string()))
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}

async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let _ = h.take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
    }
    buf
}
