use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use tracing::{info, warn};

use service::auth::domain::{AuthSession, LoginInput, RegisterInput, UpdateDetailsInput, UpdatePasswordInput};
use service::guard::Principal;

use super::data;
use crate::errors::JsonApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty()).map(String::from)
}

/// Resolve the acting principal from `Authorization: Bearer <token>`, falling
/// back to the auth cookie. Missing, invalid or orphaned tokens yield 401.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, JsonApiError> {
    let token = bearer_token(req.headers()).or_else(|| {
        CookieJar::from_headers(req.headers())
            .get(&state.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty() && t != "none")
    });
    let Some(token) = token else {
        warn!(path = %req.uri().path(), "missing bearer token and auth cookie");
        return Err(JsonApiError::unauthenticated());
    };
    let principal = state.auth.authenticate(&token).await.map_err(|e| {
        warn!(path = %req.uri().path(), code = e.code(), error = %e, "token rejected");
        JsonApiError::unauthenticated()
    })?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

fn token_response(state: &AppState, jar: CookieJar, session: AuthSession) -> (CookieJar, Json<Value>) {
    let cookie = Cookie::build((state.cookie_name.to_string(), session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), Json(json!({ "success": true, "token": session.token })))
}

#[utoipa::path(post, path = "/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 200, description = "Registered"), (status = 400, description = "Validation Error")))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<(CookieJar, Json<Value>), JsonApiError> {
    let session = state.auth.register(input).await?;
    Ok(token_response(&state, jar, session))
}

#[utoipa::path(post, path = "/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged In"), (status = 401, description = "Invalid credentials")))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<(CookieJar, Json<Value>), JsonApiError> {
    let session = state.auth.login(input).await?;
    Ok(token_response(&state, jar, session))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.remove(Cookie::build(state.cookie_name.to_string()).path("/"));
    info!("cookie_cleared");
    (jar, data(json!({})))
}

pub async fn me(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> Result<Json<Value>, JsonApiError> {
    Ok(data(state.auth.me(principal.id).await?))
}

pub async fn update_details(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(input): ApiJson<UpdateDetailsInput>,
) -> Result<Json<Value>, JsonApiError> {
    Ok(data(state.auth.update_details(principal.id, input).await?))
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    jar: CookieJar,
    ApiJson(input): ApiJson<UpdatePasswordInput>,
) -> Result<(CookieJar, Json<Value>), JsonApiError> {
    let session = state.auth.update_password(principal.id, input).await?;
    Ok(token_response(&state, jar, session))
}
