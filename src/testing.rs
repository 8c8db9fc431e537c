use async_trait::async_trait;
use std::io;
use std::sync::Mutex;

use crate::executor::{CommandRunner, ExecError, ExecutionRequest, ExecutionResult};

enum Reply {
    Output { stdout: Vec<u8>, success: bool },
    SpawnError,
}

/// Command runner that records every request and answers with a canned reply.
pub struct FakeRunner {
    reply: Reply,
    calls: Mutex<Vec<ExecutionRequest>>,
}

impl FakeRunner {
    /// Exits zero after printing `stdout`.
    pub fn replying(stdout: &[u8]) -> Self {
        Self::with(Reply::Output {
            stdout: stdout.to_vec(),
            success: true,
        })
    }

    /// Exits non-zero after printing `stdout`.
    pub fn failing(stdout: &[u8]) -> Self {
        Self::with(Reply::Output {
            stdout: stdout.to_vec(),
            success: false,
        })
    }

    pub fn unspawnable() -> Self {
        Self::with(Reply::SpawnError)
    }

    fn with(reply: Reply) -> Self {
        Self {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ExecutionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult, ExecError> {
        let program = request.program.clone();
        self.calls.lock().unwrap().push(request);
        match &self.reply {
            Reply::Output { stdout, success } => Ok(ExecutionResult {
                stdout: stdout.clone(),
                success: *success,
                exit_code: Some(if *success { 0 } else { 1 }),
            }),
            Reply::SpawnError => Err(ExecError::Spawn {
                program,
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            }),
        }
    }
}
