use thiserror::Error;
use uuid::Uuid;

use models::errors::ModelError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    /// All violated fields joined into one message.
    #[error("{0}")]
    ValidationFailed(String),
    #[error("invalid filter: {0}")]
    BadFilter(String),
    #[error("duplicate value for {0}")]
    DuplicateKey(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
    #[error("database error: {0}")]
    Db(String),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: Uuid) -> Self {
        Self::NotFound(format!("No {} found with id of {}", entity, id))
    }

    pub fn unauthorized(principal: Uuid, action: &str) -> Self {
        Self::Unauthorized(format!("User {} is not authorized to {}", principal, action))
    }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(_) => ServiceError::ValidationFailed(e.to_string()),
            ModelError::Serde(msg) | ModelError::Db(msg) => ServiceError::Db(msg),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
