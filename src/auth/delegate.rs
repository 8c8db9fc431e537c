use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use super::IdentityClaims;
use crate::executor::{CommandRunner, ExecError, ExecutionRequest};

/// A rejected login. Expected, never an internal error.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("login handler rejected the credentials (exit code {exit_code:?})")]
    Rejected { exit_code: Option<i32> },

    #[error("login handler output is not JSON: {0}")]
    MalformedOutput(#[from] serde_json::Error),

    #[error("login handler output is not a JSON object")]
    NotAnObject,

    #[error("login handler could not run: {0}")]
    Execution(#[from] ExecError),
}

/// Turns credentials into claims by running the reserved login executable.
pub struct AuthDelegate {
    runner: Arc<dyn CommandRunner>,
    program: PathBuf,
    path: String,
    id_key: String,
}

impl AuthDelegate {
    pub fn new(runner: Arc<dyn CommandRunner>, program: PathBuf, path: String, id_key: String) -> Self {
        Self {
            runner,
            program,
            path,
            id_key,
        }
    }

    pub async fn authenticate(&self, credentials: &[u8]) -> Result<IdentityClaims, AuthFailure> {
        let request = ExecutionRequest {
            program: self.program.clone(),
            input: credentials.to_vec(),
            env: IdentityClaims::empty().exec_env(&self.path, &self.id_key),
        };

        let result = self.runner.run(request).await?;
        if !result.success {
            return Err(AuthFailure::Rejected {
                exit_code: result.exit_code,
            });
        }

        match serde_json::from_slice::<Value>(&result.stdout)? {
            Value::Object(map) => {
                let claims = IdentityClaims::new(map);
                match claims.identity(&self.id_key) {
                    Some(id) => tracing::info!(identity = %id, "login accepted"),
                    None => tracing::warn!("login accepted but claims carry no string {:?} claim", self.id_key),
                }
                Ok(claims)
            }
            _ => Err(AuthFailure::NotAnObject),
        }
    }
}
