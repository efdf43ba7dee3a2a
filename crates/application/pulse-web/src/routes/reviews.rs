//! Reviews -- `/api/reviews`

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

use pulse_core::{ReviewForm, ReviewUpdateForm};

use crate::routes::json_body;
use crate::{ApiError, AppState, Session};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reviews", get(list_reviews).post(create_review))
        .route(
            "/reviews/{id}",
            get(get_review).put(update_review).delete(delete_review),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewQuery {
    #[serde(default)]
    property_id: Option<String>,
}

async fn list_reviews(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ReviewQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let reviews = state
        .service
        .list_reviews(query.property_id.as_deref())
        .await?;
    Ok(Json(reviews))
}

async fn create_review(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<ReviewForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = json_body(payload)?;
    let review = state.service.create_review(session.identity(), form).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Review added successfully", "review": review })),
    ))
}

async fn get_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get_review(&id).await?))
}

async fn update_review(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
    payload: Result<Json<ReviewUpdateForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = json_body(payload)?;
    let review = state
        .service
        .update_review(session.identity(), &id, form)
        .await?;
    Ok(Json(review))
}

async fn delete_review(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_review(session.identity(), &id).await?;
    Ok(Json(json!({ "message": "Review deleted" })))
}
