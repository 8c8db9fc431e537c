//! JSON Schema checks for handler input and output payloads.

use jsonschema::error::ValidationErrorKind;
use jsonschema::ValidationError;
use serde::Serialize;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const ROOT_FIELD: &str = "(root)";

/// Schema could not be used at all. Always the service's fault.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("cannot read schema {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("schema {path} is not valid JSON: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("schema {path} is not a usable JSON Schema: {message}")]
    Compile { path: PathBuf, message: String },
}

/// One violated constraint, as reported to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub parameter: String,
    pub value: Value,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid,
    /// Never empty
    Invalid(Vec<FieldError>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// Loads a schema from disk on every call and checks a payload against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate raw bytes. Bytes that are not JSON are an invalid payload.
    pub async fn validate(&self, schema_path: &Path, payload: &[u8]) -> Result<ValidationOutcome, SchemaError> {
        let schema = load_schema(schema_path).await?;
        let instance = match serde_json::from_slice::<Value>(payload) {
            Ok(instance) => instance,
            Err(e) => {
                return Ok(ValidationOutcome::Invalid(vec![FieldError {
                    parameter: ROOT_FIELD.to_string(),
                    value: Value::Null,
                    error: format!("payload is not valid JSON: {}", e),
                }]))
            }
        };
        check(schema_path, &schema, &instance)
    }

    /// Validate a payload that has already been parsed.
    pub async fn validate_value(&self, schema_path: &Path, instance: &Value) -> Result<ValidationOutcome, SchemaError> {
        let schema = load_schema(schema_path).await?;
        check(schema_path, &schema, instance)
    }
}

async fn load_schema(path: &Path) -> Result<Value, SchemaError> {
    let raw = tokio::fs::read(path).await.map_err(|source| SchemaError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| SchemaError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn check(path: &Path, schema: &Value, instance: &Value) -> Result<ValidationOutcome, SchemaError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| SchemaError::Compile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let errors: Vec<FieldError> = validator.iter_errors(instance).map(field_error).collect();
    if errors.is_empty() {
        Ok(ValidationOutcome::Valid)
    } else {
        Ok(ValidationOutcome::Invalid(errors))
    }
}

fn field_error(error: ValidationError<'_>) -> FieldError {
    let mut segments = pointer_segments(&error.instance_path.to_string());
    if let ValidationErrorKind::Required { property } = &error.kind {
        match property.as_str() {
            Some(name) => segments.push(name.to_string()),
            None => segments.push(property.to_string()),
        }
    }
    let parameter = if segments.is_empty() {
        ROOT_FIELD.to_string()
    } else {
        segments.join(".")
    };
    FieldError {
        parameter,
        error: error.to_string(),
        value: error.instance.into_owned(),
    }
}

/// Split a JSON pointer such as `/items/0/name` into unescaped segments.
fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}
