use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use super::IdentityClaims;
use crate::config::SecurityConfig;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT generation error: {0}")]
    Generation(jsonwebtoken::errors::Error),

    #[error("invalid JWT token: {0}")]
    Invalid(jsonwebtoken::errors::Error),

    #[error("token timeout {0:?} is out of range")]
    Timeout(Duration),
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expire: DateTime<Utc>,
}

/// Signs and verifies the bearer tokens that carry login claims between requests.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    timeout: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], timeout: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            timeout,
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        if security.jwt_secret.is_empty() {
            tracing::warn!("AMLD_JWT_SECRET is empty! JWT tokens are insecure.");
        }
        Self::new(security.jwt_secret.as_bytes(), security.jwt_timeout)
    }

    /// Sign the claims, adding `exp` and `orig_iat`.
    pub fn issue(&self, claims: &IdentityClaims) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let timeout = chrono::Duration::from_std(self.timeout).map_err(|_| TokenError::Timeout(self.timeout))?;
        let expire = now
            .checked_add_signed(timeout)
            .ok_or(TokenError::Timeout(self.timeout))?;

        let mut payload: Map<String, Value> = claims.as_map().clone();
        payload.insert("exp".to_string(), Value::from(expire.timestamp()));
        payload.insert("orig_iat".to_string(), Value::from(now.timestamp()));

        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(TokenError::Generation)?;
        Ok(IssuedToken { token, expire })
    }

    /// Check signature and expiry, then hand back the full claims set.
    pub fn verify(&self, token: &str) -> Result<IdentityClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Claims come from the login executable; an `aud` it returns is data, not a constraint
        validation.validate_aud = false;
        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &validation).map_err(TokenError::Invalid)?;
        Ok(IdentityClaims::new(data.claims))
    }
}
