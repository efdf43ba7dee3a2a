//! Bookmarks -- `/api/bookmarks`

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

use crate::routes::json_body;
use crate::{ApiError, AppState, Session};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookmarks", get(saved_properties).post(toggle_bookmark))
        .route("/bookmarks/{property_id}", get(bookmark_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleBody {
    #[serde(default)]
    property_id: String,
}

async fn toggle_bookmark(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<ToggleBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let toggle = state
        .service
        .toggle_bookmark(session.identity(), &body.property_id)
        .await?;
    Ok(Json(toggle))
}

async fn bookmark_status(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(property_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let is_bookmarked = state
        .service
        .bookmark_status(session.identity(), &property_id)
        .await?;
    Ok(Json(json!({ "isBookmarked": is_bookmarked })))
}

async fn saved_properties(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.saved_properties(session.identity()).await?))
}
