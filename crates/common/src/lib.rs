//! Shared building blocks for the listings API: logging setup, metrics and
//! small wire types used by more than one crate.

pub mod types;
pub mod utils;
pub mod metrics;
