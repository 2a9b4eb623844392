use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use models::review::ReviewInput;
use service::guard::Principal;
use service::query::QueryParams;

use super::{data, list as list_body, page, parse_id};
use crate::errors::JsonApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Result<Json<Value>, JsonApiError> {
    Ok(page(state.reviews.list(&params).await?))
}

pub async fn list_for_listing(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, JsonApiError> {
    Ok(list_body(state.reviews.list_for_listing(parse_id(&id)?).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, JsonApiError> {
    Ok(data(state.reviews.get(parse_id(&id)?).await?))
}

#[utoipa::path(
    post, path = "/listings/{id}/reviews", tag = "reviews",
    params(("id" = String, Path, description = "Listing id")),
    request_body = crate::openapi::ReviewRequest,
    responses((status = 201, description = "Created"), (status = 400, description = "Duplicate review"), (status = 403, description = "Forbidden"), (status = 404, description = "Listing not found"))
)]
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(listing_id): Path<String>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    let created = state.reviews.create(&principal, parse_id(&listing_id)?, input).await?;
    Ok((StatusCode::CREATED, data(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> Result<Json<Value>, JsonApiError> {
    Ok(data(state.reviews.update(&principal, parse_id(&id)?, input).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Value>, JsonApiError> {
    state.reviews.delete(&principal, parse_id(&id)?).await?;
    Ok(data(json!({})))
}
