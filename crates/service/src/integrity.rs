//! Referential Integrity Enforcer: parent existence checks and the listing cascade.

use tracing::{info, instrument};
use uuid::Uuid;

use models::{Collection, Document};

use crate::errors::{ServiceError, ServiceResult};
use crate::query::filter::Filter;
use crate::rollup::LISTING_REF_FIELD;
use crate::store::DocumentStore;

/// Collections whose documents are owned by a listing.
pub const DEPENDENTS: [Collection; 2] = [Collection::Offerings, Collection::Reviews];

/// Load a listing or fail with `NotFound`.
pub async fn ensure_listing_exists(store: &dyn DocumentStore, listing_id: Uuid) -> ServiceResult<Document> {
    store
        .find_by_id(Collection::Listings, listing_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("listing", listing_id))
}

/// Remove every dependent of `listing_id`, then the listing itself.
///
/// The steps are not atomic: a failure after some dependents were removed
/// leaves them removed and the listing in place.
#[instrument(skip(store))]
pub async fn cascade_delete_listing(store: &dyn DocumentStore, listing_id: Uuid) -> ServiceResult<Document> {
    ensure_listing_exists(store, listing_id).await?;
    let by_parent = Filter::eq(LISTING_REF_FIELD, listing_id);
    let mut removed = 0;
    for collection in DEPENDENTS {
        let n = store
            .delete_many(collection, &by_parent)
            .await
            .map_err(|e| ServiceError::UpstreamFailure(format!("cascade over {collection}: {e}")))?;
        info!(%listing_id, %collection, removed = n, "cascade step done");
        removed += n;
    }
    common::metrics::record_cascade(removed);
    store
        .delete_by_id(Collection::Listings, listing_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("listing", listing_id))
}
