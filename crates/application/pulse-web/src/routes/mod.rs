pub mod bookmarks;
pub mod health;
pub mod messages;
pub mod properties;
pub mod reviews;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::ApiError;

/// Unwrap a JSON body, turning a rejection into a `400 {"error"}`.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    Ok(payload?.0)
}
