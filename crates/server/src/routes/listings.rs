use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use models::listing::ListingInput;
use service::guard::Principal;
use service::query::QueryParams;

use super::{data, page, parse_id};
use crate::errors::JsonApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

#[utoipa::path(
    get, path = "/listings", tag = "listings",
    params(
        ("select" = Option<String>, Query, description = "Comma separated fields to return"),
        ("sort" = Option<String>, Query, description = "Comma separated fields, leading - for descending"),
        ("page" = Option<u64>, Query, description = "1-based page, default 1"),
        ("limit" = Option<u64>, Query, description = "Page size, default 25"),
    ),
    responses((status = 200, description = "Page of listings"), (status = 400, description = "Bad Filter"))
)]
pub async fn list(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Result<Json<Value>, JsonApiError> {
    Ok(page(state.listings.list(&params).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, JsonApiError> {
    Ok(data(state.listings.get(parse_id(&id)?).await?))
}

#[utoipa::path(post, path = "/listings", tag = "listings", request_body = crate::openapi::ListingRequest, responses((status = 201, description = "Created"), (status = 400, description = "Validation Error"), (status = 403, description = "Forbidden")))]
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(input): ApiJson<ListingInput>,
) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    Ok((StatusCode::CREATED, data(state.listings.create(&principal, input).await?)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ListingInput>,
) -> Result<Json<Value>, JsonApiError> {
    Ok(data(state.listings.update(&principal, parse_id(&id)?, input).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Value>, JsonApiError> {
    state.listings.delete(&principal, parse_id(&id)?).await?;
    Ok(data(json!({})))
}
