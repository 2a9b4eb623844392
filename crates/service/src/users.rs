use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use models::user::{Role, User, UserInput};
use models::Collection;

use crate::auth::{AuthRepository, AuthService, StoreAuthRepository, TokenService};
use crate::errors::{ServiceError, ServiceResult};
use crate::guard::{ensure_role, Principal};
use crate::query::{shape, translate, ListOptions, Page, QueryParams};
use crate::store::DocumentStore;

/// Administrative user management. Every operation requires the admin role.
pub struct UserService {
    store: Arc<dyn DocumentStore>,
    accounts: AuthService<StoreAuthRepository>,
    repo: Arc<StoreAuthRepository>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>, tokens: TokenService) -> Self {
        let repo = Arc::new(StoreAuthRepository::new(store.clone()));
        Self { store, accounts: AuthService::new(repo.clone(), tokens), repo }
    }

    pub async fn list(&self, principal: &Principal, params: &QueryParams) -> ServiceResult<Page> {
        ensure_role(principal, &[Role::Admin])?;
        let filter = translate(params)?;
        shape(self.store.as_ref(), Collection::Users, &filter, &ListOptions::from_params(params), &[]).await
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> ServiceResult<User> {
        ensure_role(principal, &[Role::Admin])?;
        self.repo.find_user(id).await?.ok_or_else(|| ServiceError::not_found("user", id))
    }

    #[instrument(skip(self, input), fields(principal = %principal.id))]
    pub async fn create(&self, principal: &Principal, input: UserInput) -> ServiceResult<User> {
        ensure_role(principal, &[Role::Admin])?;
        let user = self.accounts.create_account(&input).await?;
        info!(user_id = %user.id, role = user.role.as_str(), "user_created_by_admin");
        Ok(user)
    }

    /// Name, email and role only; passwords change through the auth routes.
    #[instrument(skip(self, input), fields(principal = %principal.id))]
    pub async fn update(&self, principal: &Principal, id: Uuid, input: UserInput) -> ServiceResult<User> {
        let mut user = self.get(principal, id).await?;
        user.apply(&UserInput { password: None, ..input })?;
        Ok(self.repo.update_user(&user).await?)
    }

    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> ServiceResult<()> {
        ensure_role(principal, &[Role::Admin])?;
        if !self.repo.delete_user(id).await? {
            return Err(ServiceError::not_found("user", id));
        }
        info!(user_id = %id, "user_deleted");
        Ok(())
    }
}
