//! Listings -- `/api/properties`

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tracing::debug;

use pulse_core::{PropertyForm, PropertyPatch};
use pulse_media::ImageUpload;
use pulse_service::{ListParams, SearchParams};

use crate::routes::json_body;
use crate::{ApiError, AppState, Session};

/// Upper bound for the add-property form, images included.
const MAX_FORM_BYTES: usize = 20 * 1024 * 1024;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/properties",
            get(list_properties)
                .post(create_property)
                .layer(DefaultBodyLimit::max(MAX_FORM_BYTES)),
        )
        .route("/properties/search", get(search_properties))
        .route("/properties/featured", get(featured_properties))
        .route("/properties/user/{user_id}", get(user_properties))
        .route(
            "/properties/{id}",
            get(get_property).put(update_property).delete(delete_property),
        )
        .route("/properties/{id}/increment-views", post(increment_views))
        .route("/properties/{id}/ratings", get(property_rating))
}

async fn list_properties(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let page = state.service.list_properties(&params).await?;
    Ok(Json(page))
}

async fn search_properties(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let page = state.service.search_properties(&params).await?;
    Ok(Json(page))
}

async fn featured_properties(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.featured_properties().await?))
}

async fn user_properties(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.user_properties(&user_id).await?))
}

/// Multipart add-property form. Redirects to the new listing's page.
async fn create_property(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = PropertyForm::default();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "images" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?;
            let upload = ImageUpload::new(file_name, bytes.to_vec());
            images.push(match content_type {
                Some(content_type) => upload.with_content_type(content_type),
                None => upload,
            });
        } else {
            let value = field.text().await?;
            if !form.set(&name, value) {
                debug!(field = %name, "Ignoring unknown form field");
            }
        }
    }

    let property = state
        .service
        .create_property(session.identity(), form, images)
        .await?;
    Ok(Redirect::to(&state.property_url(property.id.as_str())).into_response())
}

async fn get_property(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get_property(&id).await?))
}

async fn update_property(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
    payload: Result<Json<PropertyPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = json_body(payload)?;
    let property = state
        .service
        .update_property(session.identity(), &id, patch)
        .await?;
    Ok(Json(property))
}

async fn delete_property(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_property(session.identity(), &id).await?;
    Ok(Json(json!({ "message": "Property deleted" })))
}

async fn increment_views(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let views = state.service.increment_views(&id).await?;
    Ok(Json(json!({ "viewCount": views })))
}

async fn property_rating(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.property_rating(&id).await?))
}
