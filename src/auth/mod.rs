pub mod delegate;
pub mod jwt;

pub use delegate::{AuthDelegate, AuthFailure};
pub use jwt::{IssuedToken, TokenError, TokenIssuer};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claims produced by the login executable.
///
/// Stored as an open map: only the identity key has a typed accessor, every
/// other claim passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityClaims(Map<String, Value>);

impl IdentityClaims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// No claims yet, as seen by the login executable.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Value of the identity claim, when it is a string.
    pub fn identity(&self, id_key: &str) -> Option<&str> {
        self.0.get(id_key).and_then(Value::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Complete environment for a handler invocation on behalf of these claims.
    pub fn exec_env(&self, path: &str, id_key: &str) -> Vec<(String, String)> {
        vec![
            ("PATH".to_string(), path.to_string()),
            ("JWT_ID".to_string(), self.identity(id_key).unwrap_or_default().to_string()),
            ("JWT_CLAIMS".to_string(), self.to_json_string()),
        ]
    }
}

impl From<Map<String, Value>> for IdentityClaims {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}
