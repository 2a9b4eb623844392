//! Domain records of the listings API and their storage shape.
//! - `listing`, `offering`, `review`, `user`: typed records with field validation
//! - `document`: the JSON document form every record is stored as, plus the
//!   sea-orm entity for the Postgres `document` table
//! - `db`: connection helpers

pub mod errors;
pub mod db;
pub mod document;
pub mod validate;
pub mod listing;
pub mod offering;
pub mod review;
pub mod user;

pub use document::{Collection, Document};
