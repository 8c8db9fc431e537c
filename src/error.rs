// HTTP API Error Types
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::schema::FieldError;

/// Client-visible failure. Internal detail is logged where the error is
/// produced and never carried here.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(Vec<FieldError>),

    // 401 Unauthorized
    Unauthorized { realm: String },

    // 404 Not Found
    NotFound,

    // 500 Internal Server Error
    InternalServerError,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Generic status string shown to clients
    pub fn status(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Bad request",
            ApiError::Unauthorized { .. } => "Unauthorized",
            ApiError::NotFound => "Not found",
            ApiError::InternalServerError => "Internal server error",
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "code": self.status_code().as_u16(),
            "status": self.status(),
        });
        if let ApiError::BadRequest(errors) = self {
            body["error"] = json!(errors);
        }
        body
    }

    pub fn unauthorized(realm: impl Into<String>) -> Self {
        ApiError::Unauthorized { realm: realm.into() }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status_code().as_u16(), self.status())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status_code(), Json(self.to_json())).into_response();
        if let ApiError::Unauthorized { realm } = &self {
            let challenge = format!("JWT realm=\"{}\"", realm);
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_carries_field_errors() {
        let err = ApiError::BadRequest(vec![FieldError {
            parameter: "name".to_string(),
            value: json!({}),
            error: "\"name\" is a required property".to_string(),
        }]);
        let body = err.to_json();
        assert_eq!(body["code"], 400);
        assert_eq!(body["status"], "Bad request");
        assert_eq!(body["error"][0]["parameter"], "name");
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let body = ApiError::InternalServerError.to_json();
        assert_eq!(body, json!({"code": 500, "status": "Internal server error"}));
    }

    #[test]
    fn test_unauthorized_sets_challenge() {
        let response = ApiError::unauthorized("api-moduled").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "JWT realm=\"api-moduled\""
        );
    }
}
