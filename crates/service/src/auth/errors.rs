use thiserror::Error;

use crate::errors::ServiceError;

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("user already exists")]
    Conflict,
    #[error("user not found")]
    NotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not authorized to access this route")]
    MissingToken,
    #[error("token error: {0}")]
    TokenError(String),
    #[error("hashing error: {0}")]
    HashError(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict => 1002,
            AuthError::NotFound => 1003,
            AuthError::InvalidCredentials => 1004,
            AuthError::MissingToken => 1005,
            AuthError::TokenError(_) => 1102,
            AuthError::HashError(_) => 1101,
            AuthError::Repository(_) => 1200,
        }
    }
}

impl From<models::errors::ModelError> for AuthError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::Validation(_) => AuthError::Validation(e.to_string()),
            other => AuthError::Repository(other.to_string()),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(msg) => ServiceError::ValidationFailed(msg),
            AuthError::Conflict => ServiceError::DuplicateKey("users(email)".into()),
            AuthError::NotFound => ServiceError::NotFound(e.to_string()),
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::TokenError(_) => {
                ServiceError::Unauthenticated(e.to_string())
            }
            AuthError::HashError(_) | AuthError::Repository(_) => ServiceError::Db(e.to_string()),
        }
    }
}
