//! Per-request pipeline: resolve route, check input, run the handler,
//! check output, hand back the handler's JSON object.

use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::IdentityClaims;
use crate::error::ApiError;
use crate::executor::{CommandRunner, ExecutionRequest};
use crate::registry::{HandlerDescriptor, HandlerRegistry};
use crate::schema::{SchemaValidator, ValidationOutcome};

pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    runner: Arc<dyn CommandRunner>,
    validator: SchemaValidator,
    path: String,
    id_key: String,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, runner: Arc<dyn CommandRunner>, path: String, id_key: String) -> Self {
        Self {
            registry,
            runner,
            validator: SchemaValidator::new(),
            path,
            id_key,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub async fn dispatch(
        &self,
        route: &str,
        body: &[u8],
        claims: &IdentityClaims,
    ) -> Result<Map<String, Value>, ApiError> {
        let span = tracing::info_span!(
            "dispatch",
            route = %route,
            request_id = %Uuid::new_v4(),
            identity = %claims.identity(&self.id_key).unwrap_or_default(),
        );
        async move {
            let descriptor = self.registry.get(route).ok_or_else(|| {
                tracing::debug!("no handler registered");
                ApiError::NotFound
            })?;
            self.run_handler(descriptor, body, claims).await
        }
        .instrument(span)
        .await
    }

    async fn run_handler(
        &self,
        descriptor: &HandlerDescriptor,
        body: &[u8],
        claims: &IdentityClaims,
    ) -> Result<Map<String, Value>, ApiError> {
        if let Some(schema) = &descriptor.input_schema {
            match self.validator.validate(schema, body).await {
                Ok(ValidationOutcome::Valid) => {}
                Ok(ValidationOutcome::Invalid(errors)) => {
                    tracing::info!("input rejected with {} field error(s)", errors.len());
                    return Err(ApiError::BadRequest(errors));
                }
                Err(e) => {
                    tracing::error!("input validation error: {}", e);
                    return Err(ApiError::InternalServerError);
                }
            }
        }

        let request = ExecutionRequest {
            program: descriptor.program.clone(),
            input: body.to_vec(),
            env: claims.exec_env(&self.path, &self.id_key),
        };
        let result = self.runner.run(request).await.map_err(|e| {
            tracing::error!("{}", e);
            ApiError::InternalServerError
        })?;
        if !result.success {
            tracing::error!(
                "error from {}: exit code {:?}",
                descriptor.program.display(),
                result.exit_code
            );
            return Err(ApiError::InternalServerError);
        }

        let response = match serde_json::from_slice::<Value>(&result.stdout) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                tracing::error!("handler output is not a JSON object");
                tracing::debug!("response buffer: {}", String::from_utf8_lossy(&result.stdout));
                return Err(ApiError::InternalServerError);
            }
            Err(e) => {
                tracing::error!("handler output is not JSON: {}", e);
                tracing::debug!("response buffer: {}", String::from_utf8_lossy(&result.stdout));
                return Err(ApiError::InternalServerError);
            }
        };

        if let Some(schema) = &descriptor.output_schema {
            self.check_output(schema, &response).await?;
        }

        Ok(response)
    }

    /// Output contract violations are the service's fault, so always 500.
    async fn check_output(&self, schema: &Path, response: &Map<String, Value>) -> Result<(), ApiError> {
        let value = Value::Object(response.clone());
        match self.validator.validate_value(schema, &value).await {
            Ok(ValidationOutcome::Valid) => Ok(()),
            Ok(ValidationOutcome::Invalid(errors)) => {
                for error in &errors {
                    tracing::error!(
                        parameter = %error.parameter,
                        "output validation failed: {}",
                        error.error
                    );
                }
                Err(ApiError::InternalServerError)
            }
            Err(e) => {
                tracing::error!("output validation error: {}", e);
                Err(ApiError::InternalServerError)
            }
        }
    }
}
