use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use models::user::UserInput;
use service::guard::Principal;
use service::query::QueryParams;

use super::{data, page, parse_id};
use crate::errors::JsonApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Value>, JsonApiError> {
    Ok(page(state.users.list(&principal, &params).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Value>, JsonApiError> {
    Ok(data(state.users.get(&principal, parse_id(&id)?).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(input): ApiJson<UserInput>,
) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    Ok((StatusCode::CREATED, data(state.users.create(&principal, input).await?)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UserInput>,
) -> Result<Json<Value>, JsonApiError> {
    Ok(data(state.users.update(&principal, parse_id(&id)?, input).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Value>, JsonApiError> {
    state.users.delete(&principal, parse_id(&id)?).await?;
    Ok(data(json!({})))
}
