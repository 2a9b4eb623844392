use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use models::document::{from_document, to_document};
use models::user::{Credentials, User};
use models::Collection;

use super::errors::AuthError;
use crate::errors::ServiceError;
use crate::query::filter::Filter;
use crate::store::DocumentStore;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AuthError>;
    async fn create_user(&self, user: &User) -> Result<User, AuthError>;
    async fn update_user(&self, user: &User) -> Result<User, AuthError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;
}

/// Users and credentials kept as documents in the `users` and `credentials` collections.
pub struct StoreAuthRepository {
    store: Arc<dyn DocumentStore>,
}

impl StoreAuthRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self { Self { store } }
}

fn repo_err(e: ServiceError) -> AuthError {
    match e {
        ServiceError::DuplicateKey(_) => AuthError::Conflict,
        ServiceError::NotFound(_) => AuthError::NotFound,
        other => AuthError::Repository(other.to_string()),
    }
}

#[async_trait]
impl AuthRepository for StoreAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let email = email.trim().to_ascii_lowercase();
        let found = self.store.find(Collection::Users, &Filter::eq("email", email)).await.map_err(repo_err)?;
        found.into_iter().next().map(from_document::<User>).transpose().map_err(AuthError::from)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let found = self.store.find_by_id(Collection::Users, id).await.map_err(repo_err)?;
        found.map(from_document::<User>).transpose().map_err(AuthError::from)
    }

    async fn create_user(&self, user: &User) -> Result<User, AuthError> {
        let doc = self.store.create(Collection::Users, to_document(user)?).await.map_err(repo_err)?;
        Ok(from_document(doc)?)
    }

    async fn update_user(&self, user: &User) -> Result<User, AuthError> {
        let doc = self.store.update_by_id(Collection::Users, user.id, to_document(user)?).await.map_err(repo_err)?;
        Ok(from_document(doc)?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AuthError> {
        self.store.delete_by_id(Collection::Credentials, id).await.map_err(repo_err)?;
        Ok(self.store.delete_by_id(Collection::Users, id).await.map_err(repo_err)?.is_some())
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let found = self.store.find_by_id(Collection::Credentials, user_id).await.map_err(repo_err)?;
        found.map(from_document::<Credentials>).transpose().map_err(AuthError::from)
    }

    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        if password_hash.trim().is_empty() {
            return Err(AuthError::Validation("password hash required".into()));
        }
        let creds = Credentials { id: user_id, password_hash, password_algorithm, updated_at: Utc::now() };
        let doc = to_document(&creds)?;
        let exists = self.store.find_by_id(Collection::Credentials, user_id).await.map_err(repo_err)?.is_some();
        if exists {
            self.store.update_by_id(Collection::Credentials, user_id, doc).await.map_err(repo_err)?;
        } else {
            self.store.create(Collection::Credentials, doc).await.map_err(repo_err)?;
        }
        Ok(creds)
    }
}
