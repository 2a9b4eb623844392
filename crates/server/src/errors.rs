use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use service::auth::AuthError;
use service::errors::ServiceError;

/// Error envelope returned by every handler: `{ "success": false, "error": ... }`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub title: &'static str,
    pub detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, title: &'static str, detail: Option<String>) -> Self {
        Self { status, title, detail }
    }

    pub fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Not authorized to access this route", None)
    }

    /// Malformed ids are reported like missing records.
    pub fn bad_id(raw: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found", Some(format!("Resource not found with id of {raw}")))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        common::metrics::record_http_error(self.status.as_u16());
        let message = self.detail.unwrap_or_else(|| self.title.to_string());
        (self.status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        let (status, title) = match &e {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            ServiceError::ValidationFailed(_) => (StatusCode::BAD_REQUEST, "Validation Error"),
            ServiceError::BadFilter(_) => (StatusCode::BAD_REQUEST, "Bad Filter"),
            ServiceError::DuplicateKey(_) => (StatusCode::BAD_REQUEST, "Duplicate Key"),
            ServiceError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "Unauthenticated"),
            ServiceError::Unauthorized(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            ServiceError::UpstreamFailure(_) | ServiceError::Db(_) => {
                error!(error = %e, "request failed");
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server Error", None);
            }
        };
        warn!(status = status.as_u16(), error = %e, "request rejected");
        Self::new(status, title, Some(e.to_string()))
    }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        warn!(code = e.code(), "auth failure");
        ServiceError::from(e).into()
    }
}

/// Unreadable request bodies are validation failures.
impl From<JsonRejection> for JsonApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = rejection.status().as_u16(), error = %rejection.body_text(), "request body rejected");
        Self::new(StatusCode::BAD_REQUEST, "Validation Error", Some(rejection.body_text()))
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
