//! Service layer of the listings API.
//! - `store`: document store abstraction with in-memory and Postgres backends
//! - `query`: request parameters to filters, then sorted and paginated pages
//! - `rollup`, `integrity`, `guard`: derived aggregates, cascades, mutation rights
//! - `listings`, `offerings`, `reviews`, `users`, `auth`: entity services

pub mod errors;
pub mod store;
pub mod query;
pub mod rollup;
pub mod integrity;
pub mod guard;
pub mod listings;
pub mod offerings;
pub mod reviews;
pub mod users;
pub mod auth;
#[cfg(test)]
pub mod test_support;

pub use errors::{ServiceError, ServiceResult};
pub use guard::Principal;
