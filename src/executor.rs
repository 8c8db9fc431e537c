//! Running handler executables.
//!
//! Each invocation gets exactly the environment it is given, its input on
//! stdin, and has its stdout buffered in full. Stderr goes to the service log.

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// How long stdin/stderr relays may outlive the child. A background
/// grandchild can hold the pipes open indefinitely.
const RELAY_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start {program}: {source}")]
    Spawn { program: PathBuf, source: io::Error },

    #[error("i/o error while running {program}: {source}")]
    Io { program: PathBuf, source: io::Error },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: PathBuf, timeout: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub program: PathBuf,
    pub input: Vec<u8>,
    /// Complete environment of the child, nothing else is inherited
    pub env: Vec<(String, String)>,
}

impl ExecutionRequest {
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    pub success: bool,
    pub exit_code: Option<i32>,
}

/// Spawns a program, feeds it input and collects its output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult, ExecError>;
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    async fn spawn_and_wait(&self, request: ExecutionRequest) -> Result<ExecutionResult, ExecError> {
        let ExecutionRequest { program, input, env } = request;

        let mut child = Command::new(&program)
            .env_clear()
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Feed stdin separately so a child that writes before reading cannot deadlock us
        let stdin_task = child.stdin.take().map(|mut stdin| {
            let program = program.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    // The child may legitimately exit without reading its input
                    if e.kind() != io::ErrorKind::BrokenPipe {
                        tracing::warn!("writing input to {}: {}", program.display(), e);
                    }
                }
                // dropping stdin closes the pipe
            })
        });

        let stderr_task = child.stderr.take().map(|stderr| {
            let program = program.display().to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::info!(program = %program, "{}", line);
                }
            })
        });

        let output = child.wait_with_output().await.map_err(|source| ExecError::Io {
            program: program.clone(),
            source,
        })?;

        for task in [stdin_task, stderr_task].into_iter().flatten() {
            finish_relay(task).await;
        }

        Ok(ExecutionResult {
            stdout: output.stdout,
            success: output.status.success(),
            exit_code: output.status.code(),
        })
    }
}

async fn finish_relay(task: JoinHandle<()>) {
    let abort = task.abort_handle();
    if tokio::time::timeout(RELAY_GRACE, task).await.is_err() {
        abort.abort();
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult, ExecError> {
        tracing::debug!("executing {}", request.program.display());
        match self.timeout {
            None => self.spawn_and_wait(request).await,
            Some(timeout) => {
                let program = request.program.clone();
                // Dropping the future on expiry kills the child (kill_on_drop)
                tokio::time::timeout(timeout, self.spawn_and_wait(request))
                    .await
                    .map_err(|_| ExecError::Timeout { program, timeout })?
            }
        }
    }
}
