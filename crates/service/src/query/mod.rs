//! Dynamic query layer shared by every list endpoint.
//! - `filter`: request parameters to a typed [`filter::Filter`]
//! - `shaper`: selection, sort, pagination window, population

pub mod filter;
pub mod shaper;

pub use filter::{translate, Condition, Filter, QueryParams};
pub use shaper::{shape, ListOptions, Page, PageLink, Pagination, Populate};
