use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use rand::rngs::OsRng;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use models::user::{validate_password, Role, User, UserInput};

use super::domain::{AuthSession, LoginInput, RegisterInput, UpdateDetailsInput, UpdatePasswordInput};
use super::errors::AuthError;
use super::repository::AuthRepository;
use super::token::TokenService;
use crate::guard::Principal;

pub const PASSWORD_ALGORITHM: &str = "argon2";

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::HashError(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    tokens: TokenService,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, tokens: TokenService) -> Self { Self { repo, tokens } }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create a user and its credentials. Any role may be assigned here; callers
    /// decide who is allowed to pick one.
    pub async fn create_account(&self, input: &UserInput) -> Result<User, AuthError> {
        let user = User::create(input)?;
        if self.repo.find_user_by_email(&user.email).await?.is_some() {
            return Err(AuthError::Conflict);
        }
        let user = self.repo.create_user(&user).await?;
        let hash = hash_password(input.password.as_deref().unwrap_or_default())?;
        self.repo.upsert_password(user.id, hash, PASSWORD_ALGORITHM.to_string()).await?;
        Ok(user)
    }

    /// Register a new user with a hashed password and return a session.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{AuthService, StoreAuthRepository, TokenService, domain::RegisterInput};
    /// use service::store::MemoryStore;
    /// let repo = Arc::new(StoreAuthRepository::new(Arc::new(MemoryStore::new())));
    /// let svc = AuthService::new(repo, TokenService::new("secret", 1));
    /// let input = RegisterInput { name: "Jane".into(), email: "jane@example.com".into(), password: "123456".into(), role: None };
    /// let session = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(session.user.email, "jane@example.com");
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, AuthError> {
        let account = UserInput { name: Some(input.name), email: Some(input.email), role: input.role, password: Some(input.password) };
        if account.parse_role()? == Some(Role::Admin) {
            return Err(AuthError::Validation("The admin role cannot be self-assigned".into()));
        }
        let user = self.create_account(&account).await?;
        info!(user_id = %user.id, role = user.role.as_str(), "user_registered");
        self.session(user)
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        if input.email.trim().is_empty() || input.password.is_empty() {
            return Err(AuthError::Validation("Please provide an email and password".into()));
        }
        let user = self.repo.find_user_by_email(&input.email).await?.ok_or(AuthError::InvalidCredentials)?;
        let cred = self.repo.get_credentials(user.id).await?.ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(&input.password, &cred.password_hash)? {
            warn!(user_id = %user.id, "login_rejected");
            return Err(AuthError::InvalidCredentials);
        }
        info!(user_id = %user.id, "user_logged_in");
        self.session(user)
    }

    /// Resolve a bearer token to the acting principal. Tokens of deleted users fail.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let id = self.tokens.verify_token(token)?;
        let user = self.repo.find_user(id).await?.ok_or_else(|| {
            debug!(user_id = %id, "token for unknown user");
            AuthError::TokenError("user no longer exists".into())
        })?;
        Ok(Principal::new(user.id, user.role))
    }

    pub async fn me(&self, id: Uuid) -> Result<User, AuthError> {
        self.repo.find_user(id).await?.ok_or(AuthError::NotFound)
    }

    #[instrument(skip(self, input))]
    pub async fn update_details(&self, id: Uuid, input: UpdateDetailsInput) -> Result<User, AuthError> {
        let mut user = self.me(id).await?;
        user.apply(&UserInput { name: input.name, email: input.email, ..Default::default() })?;
        let updated = self.repo.update_user(&user).await?;
        info!(user_id = %id, "user_details_updated");
        Ok(updated)
    }

    /// Requires the current password; returns a fresh session.
    #[instrument(skip(self, input))]
    pub async fn update_password(&self, id: Uuid, input: UpdatePasswordInput) -> Result<AuthSession, AuthError> {
        let user = self.me(id).await?;
        let cred = self.repo.get_credentials(id).await?.ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(&input.current_password, &cred.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(&input.new_password)?;
        let hash = hash_password(&input.new_password)?;
        self.repo.upsert_password(id, hash, PASSWORD_ALGORITHM.to_string()).await?;
        info!(user_id = %id, "password_updated");
        self.session(user)
    }

    fn session(&self, user: User) -> Result<AuthSession, AuthError> {
        let token = self.tokens.issue_token(user.id)?;
        Ok(AuthSession { user, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::StoreAuthRepository;
    use crate::store::{DocumentStore, MemoryStore};
    use models::Collection;

    fn svc() -> (Arc<dyn DocumentStore>, AuthService<StoreAuthRepository>) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let repo = Arc::new(StoreAuthRepository::new(store.clone()));
        (store, AuthService::new(repo, TokenService::new("test-secret", 1)))
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput { name: "Jane Doe".into(), email: email.into(), password: "123456".into(), role: Some("publisher".into()) }
    }

    #[tokio::test]
    async fn register_login_authenticate() -> Result<(), anyhow::Error> {
        let (_store, svc) = svc();
        let session = svc.register(register_input("Jane@Example.com")).await?;
        assert_eq!(session.user.email, "jane@example.com");
        let principal = svc.authenticate(&session.token).await?;
        assert_eq!(principal, Principal::new(session.user.id, Role::Publisher));

        let login = svc.login(LoginInput { email: "jane@example.com".into(), password: "123456".into() }).await?;
        assert_eq!(login.user.id, session.user.id);
        let bad = svc.login(LoginInput { email: "jane@example.com".into(), password: "654321".into() }).await;
        assert!(matches!(bad, Err(AuthError::InvalidCredentials)));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_and_admin_self_assignment_rejected() {
        let (_store, svc) = svc();
        svc.register(register_input("jane@example.com")).await.unwrap();
        assert!(matches!(svc.register(register_input("jane@example.com")).await, Err(AuthError::Conflict)));
        let mut admin = register_input("root@example.com");
        admin.role = Some("admin".into());
        assert!(matches!(svc.register(admin).await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn password_is_hashed_and_changeable() -> Result<(), anyhow::Error> {
        let (store, svc) = svc();
        let session = svc.register(register_input("jane@example.com")).await?;
        let creds = store.find_by_id(Collection::Credentials, session.user.id).await?.expect("credentials");
        assert_ne!(creds["passwordHash"], "123456");

        let wrong = UpdatePasswordInput { current_password: "nope".into(), new_password: "abcdef".into() };
        assert!(matches!(svc.update_password(session.user.id, wrong).await, Err(AuthError::InvalidCredentials)));
        let ok = UpdatePasswordInput { current_password: "123456".into(), new_password: "abcdef".into() };
        svc.update_password(session.user.id, ok).await?;
        svc.login(LoginInput { email: "jane@example.com".into(), password: "abcdef".into() }).await?;
        Ok(())
    }

    #[tokio::test]
    async fn token_of_deleted_user_is_rejected() -> Result<(), anyhow::Error> {
        let (store, svc) = svc();
        let session = svc.register(register_input("jane@example.com")).await?;
        store.delete_by_id(Collection::Users, session.user.id).await?;
        assert!(matches!(svc.authenticate(&session.token).await, Err(AuthError::TokenError(_))));
        Ok(())
    }

    #[tokio::test]
    async fn update_details_changes_name_only_when_given() -> Result<(), anyhow::Error> {
        let (_store, svc) = svc();
        let session = svc.register(register_input("jane@example.com")).await?;
        let user = svc.update_details(session.user.id, UpdateDetailsInput { name: Some("Jane Smith".into()), email: None }).await?;
        assert_eq!(user.name, "Jane Smith");
        assert_eq!(user.email, "jane@example.com");
        Ok(())
    }
}
