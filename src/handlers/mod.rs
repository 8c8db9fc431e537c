// handlers/mod.rs - HTTP handlers
//
// session: POST /api/login (public), POST /api/logout (token required)
// route:   POST /api/:route (token required), dispatched to handler executables

pub mod route;
pub mod session;

use crate::error::ApiError;

/// Fallback for authenticated requests nothing else answered.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
