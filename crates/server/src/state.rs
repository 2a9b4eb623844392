use std::sync::Arc;

use service::auth::{AuthService, StoreAuthRepository, TokenService};
use service::listings::ListingService;
use service::offerings::OfferingService;
use service::reviews::ReviewService;
use service::store::DocumentStore;
use service::users::UserService;

/// Shared handler state; every service works over the same document store.
#[derive(Clone)]
pub struct AppState {
    pub listings: Arc<ListingService>,
    pub offerings: Arc<OfferingService>,
    pub reviews: Arc<ReviewService>,
    pub users: Arc<UserService>,
    pub auth: Arc<AuthService<StoreAuthRepository>>,
    pub cookie_name: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, cfg: &configs::AuthConfig) -> Self {
        let tokens = TokenService::from_config(cfg);
        let repo = Arc::new(StoreAuthRepository::new(store.clone()));
        Self {
            listings: Arc::new(ListingService::new(store.clone())),
            offerings: Arc::new(OfferingService::new(store.clone())),
            reviews: Arc::new(ReviewService::new(store.clone())),
            users: Arc::new(UserService::new(store, tokens.clone())),
            auth: Arc::new(AuthService::new(repo, tokens)),
            cookie_name: Arc::from(cfg.cookie_name.as_str()),
        }
    }
}
