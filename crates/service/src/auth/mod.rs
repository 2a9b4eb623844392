//! Auth collaborator: token issue/verify, registration and login.
//!
//! Three layers as elsewhere in the service crate: `domain` types, a
//! `repository` over the document store and the `service` with the rules.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod token;

pub use errors::AuthError;
pub use repository::{AuthRepository, StoreAuthRepository};
pub use service::AuthService;
pub use token::TokenService;
