use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use uuid::Uuid;

use common::types::Health;
use service::query::Page;

use crate::errors::JsonApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod auth;
pub mod listings;
pub mod offerings;
pub mod reviews;
pub mod users;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> (axum::http::StatusCode, String) {
    common::metrics::encode_metrics()
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// `{ success: true, data }`
pub(crate) fn data<T: Serialize>(value: T) -> Json<Value> {
    Json(json!({ "success": true, "data": value }))
}

/// `{ success: true, count, pagination, data }` for shaped list responses.
pub(crate) fn page(page: Page) -> Json<Value> {
    Json(json!({
        "success": true,
        "count": page.count(),
        "pagination": page.pagination,
        "data": page.items,
    }))
}

/// `{ success: true, count, data }` for unpaginated lists.
pub(crate) fn list<T: Serialize>(items: Vec<T>) -> Json<Value> {
    Json(json!({ "success": true, "count": items.len(), "data": items }))
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, JsonApiError> {
    Uuid::parse_str(raw).map_err(|_| JsonApiError::bad_id(raw))
}

/// Build the full application router: public reads, token-protected writes.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/listings", get(listings::list))
        .route("/listings/:id", get(listings::get))
        .route("/listings/:id/offerings", get(offerings::list_for_listing))
        .route("/listings/:id/reviews", get(reviews::list_for_listing))
        .route("/offerings", get(offerings::list))
        .route("/offerings/:id", get(offerings::get))
        .route("/reviews", get(reviews::list))
        .route("/reviews/:id", get(reviews::get));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/updatedetails", put(auth::update_details))
        .route("/auth/updatepassword", put(auth::update_password))
        .route("/listings", post(listings::create))
        .route("/listings/:id", put(listings::update).delete(listings::delete))
        .route("/listings/:id/offerings", post(offerings::create))
        .route("/listings/:id/reviews", post(reviews::create))
        .route("/offerings/:id", put(offerings::update).delete(offerings::delete))
        .route("/reviews/:id", put(reviews::update).delete(reviews::delete))
        .route("/users", get(users::list).post(users::create))
        .route("/users/:id", get(users::get).put(users::update).delete(users::delete))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    public
        .merge(protected)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
