use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    response::Json,
};
use serde_json::{Map, Value};

use crate::app::AppState;
use crate::auth::IdentityClaims;
use crate::error::ApiError;

/// POST /api/:route - Run the route's handler executable
///
/// The body goes to the executable's stdin unchanged (after input schema
/// checks, when the route has one). The executable's JSON object output is
/// the response body.
pub async fn dispatch(
    State(state): State<AppState>,
    Path(route): Path<String>,
    Extension(claims): Extension<IdentityClaims>,
    body: Bytes,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let response = state.dispatcher.dispatch(&route, &body, &claims).await?;
    Ok(Json(response))
}
