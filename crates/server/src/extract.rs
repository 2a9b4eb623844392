use axum::extract::FromRequest;

use crate::errors::JsonApiError;

/// `axum::Json` whose rejections (bad syntax, wrong types, missing content
/// type) come back in the error envelope as 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(JsonApiError))]
pub struct ApiJson<T>(pub T);
