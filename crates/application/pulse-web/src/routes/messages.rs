//! Inquiries and replies -- `/api/messages`

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use serde_json::json;

use pulse_core::InquiryForm;

use crate::routes::json_body;
use crate::{ApiError, AppState, Session};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/messages", get(inbox).post(send_message))
        .route("/messages/unread-count", get(unread_count))
        .route(
            "/messages/{id}",
            put(toggle_read).delete(delete_message),
        )
        .route("/messages/{id}/reply", post(reply))
}

#[derive(Debug, Deserialize)]
struct ReplyBody {
    #[serde(default)]
    body: String,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<InquiryForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = json_body(payload)?;
    let message = state.service.send_message(session.identity(), form).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Message sent", "data": message })),
    ))
}

async fn inbox(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.inbox(session.identity()).await?))
}

async fn unread_count(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.service.unread_count(session.identity()).await?;
    Ok(Json(json!({ "count": count })))
}

async fn toggle_read(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let read = state.service.toggle_read(session.identity(), &id).await?;
    Ok(Json(json!({ "read": read })))
}

async fn delete_message(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_message(session.identity(), &id).await?;
    Ok(Json(json!({ "message": "Message deleted" })))
}

async fn reply(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
    payload: Result<Json<ReplyBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let reply = state
        .service
        .reply(session.identity(), &id, body.body)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Reply sent successfully", "data": reply })),
    ))
}
