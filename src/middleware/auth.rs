use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;

const TOKEN_HEAD_NAME: &str = "Bearer";

/// Where to look for the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Header(String),
    Query(String),
    Cookie(String),
}

/// Ordered list of token sources, e.g. `"header: Authorization, query: token"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLookup(Vec<TokenSource>);

impl TokenLookup {
    /// Parse a lookup expression. Unknown or empty parts are skipped with a
    /// warning; an expression yielding nothing falls back to the
    /// Authorization header.
    pub fn parse(expr: &str) -> Self {
        let mut sources = Vec::new();
        for part in expr.split(',') {
            let Some((kind, name)) = part.split_once(':') else {
                if !part.trim().is_empty() {
                    tracing::warn!("ignoring malformed token lookup entry {:?}", part.trim());
                }
                continue;
            };
            let name = name.trim().to_string();
            if name.is_empty() {
                tracing::warn!("ignoring token lookup entry without a name: {:?}", part.trim());
                continue;
            }
            match kind.trim() {
                "header" => sources.push(TokenSource::Header(name)),
                "query" => sources.push(TokenSource::Query(name)),
                "cookie" => sources.push(TokenSource::Cookie(name)),
                other => tracing::warn!("ignoring unknown token lookup source {:?}", other),
            }
        }
        if sources.is_empty() {
            sources.push(TokenSource::Header(header::AUTHORIZATION.to_string()));
        }
        Self(sources)
    }

    pub fn sources(&self) -> &[TokenSource] {
        &self.0
    }

    /// First token found, in source order.
    pub fn extract(&self, headers: &HeaderMap, query: Option<&str>) -> Option<String> {
        self.0.iter().find_map(|source| match source {
            TokenSource::Header(name) => from_header(headers, name),
            TokenSource::Query(name) => query.and_then(|q| from_query(q, name)),
            TokenSource::Cookie(name) => from_cookie(headers, name),
        })
    }
}

fn from_header(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if scheme != TOKEN_HEAD_NAME {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn from_query(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

fn from_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}

/// Rejects requests without a valid token and injects the verified
/// [`IdentityClaims`](crate::auth::IdentityClaims) into the request.
pub async fn jwt_auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let realm = &state.config.security.jwt_realm;

    let Some(token) = state.token_lookup.extract(request.headers(), request.uri().query()) else {
        tracing::debug!("request to {} carries no token", request.uri().path());
        return ApiError::unauthorized(realm.as_str()).into_response();
    };

    let claims = match state.tokens.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("rejecting token: {}", e);
            return ApiError::unauthorized(realm.as_str()).into_response();
        }
    };

    request.extensions_mut().insert(claims);
    next.run(request).await
}
