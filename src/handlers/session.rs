use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;

/// POST /api/login - Exchange credentials for a bearer token
///
/// The request body is handed verbatim to the `login/post` executable. Its
/// JSON object output becomes the token claims.
///
/// Success:
/// ```json
/// { "code": 200, "token": "eyJhbGciOiJIUzI1NiI...", "expire": "2025-01-01T04:00:00Z" }
/// ```
pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse, ApiError> {
    let claims = state.auth.authenticate(&body).await.map_err(|e| {
        tracing::warn!("login failed: {}", e);
        ApiError::unauthorized(state.config.security.jwt_realm.as_str())
    })?;

    let issued = state.tokens.issue(&claims).map_err(|e| {
        tracing::error!("{}", e);
        ApiError::InternalServerError
    })?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "code": StatusCode::OK.as_u16(),
            "token": issued.token,
            "expire": issued.expire.to_rfc3339(),
        })),
    ))
}

/// POST /api/logout - Tokens are stateless, so this only acknowledges
pub async fn logout() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "code": StatusCode::OK.as_u16() })))
}
