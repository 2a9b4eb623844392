use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use models::document::{from_document, to_document};
use models::listing::{Listing, ListingInput};
use models::user::Role;
use models::{Collection, Document};

use crate::errors::{ServiceError, ServiceResult};
use crate::guard::{ensure_can_mutate, ensure_role, Principal};
use crate::integrity::{cascade_delete_listing, ensure_listing_exists};
use crate::query::{shape, translate, Filter, ListOptions, Page, Populate, QueryParams};
use crate::rollup::AggregateKind;
use crate::store::DocumentStore;

/// Each listing in a list response carries its offerings.
pub const WITH_OFFERINGS: Populate =
    Populate::Many { field: "offerings", foreign_key: "listingId", collection: Collection::Offerings };

/// Listing CRUD on top of the document store.
pub struct ListingService {
    store: Arc<dyn DocumentStore>,
}

impl ListingService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self { Self { store } }

    pub async fn list(&self, params: &QueryParams) -> ServiceResult<Page> {
        let filter = translate(params)?;
        let opts = ListOptions::from_params(params);
        shape(self.store.as_ref(), Collection::Listings, &filter, &opts, &[WITH_OFFERINGS]).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Document> {
        ensure_listing_exists(self.store.as_ref(), id).await
    }

    /// Publishers may own a single listing; admins any number.
    #[instrument(skip(self, input), fields(principal = %principal.id))]
    pub async fn create(&self, principal: &Principal, input: ListingInput) -> ServiceResult<Document> {
        ensure_role(principal, &[Role::Publisher, Role::Admin])?;
        if !principal.is_admin() {
            let owned = self.store.find(Collection::Listings, &Filter::eq("createdByUserId", principal.id)).await?;
            if !owned.is_empty() {
                return Err(ServiceError::ValidationFailed(format!(
                    "The user with id {} has already published a listing",
                    principal.id
                )));
            }
        }
        let listing = Listing::create(input, principal.id)?;
        let created = self.store.create(Collection::Listings, to_document(&listing)?).await?;
        info!(listing_id = %listing.id, slug = %listing.slug, "listing_created");
        Ok(created)
    }

    /// Derived aggregates are left as stored; the rollup engine owns them.
    #[instrument(skip(self, input), fields(principal = %principal.id))]
    pub async fn update(&self, principal: &Principal, id: Uuid, input: ListingInput) -> ServiceResult<Document> {
        let mut listing: Listing = from_document(self.get(id).await?)?;
        ensure_can_mutate(principal, listing.created_by_user_id, &format!("update listing {id}"))?;
        listing.apply(input)?;

        let mut patch = to_document(&listing)?;
        for kind in [AggregateKind::AverageCost, AggregateKind::AverageRating] {
            patch.remove(kind.target_field());
        }
        let updated = self.store.update_by_id(Collection::Listings, id, patch).await?;
        info!(listing_id = %id, "listing_updated");
        Ok(updated)
    }

    /// Removes the listing with all of its offerings and reviews.
    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> ServiceResult<()> {
        let listing: Listing = from_document(self.get(id).await?)?;
        ensure_can_mutate(principal, listing.created_by_user_id, &format!("delete listing {id}"))?;
        cascade_delete_listing(self.store.as_ref(), id).await?;
        info!(listing_id = %id, "listing_deleted");
        Ok(())
    }
}
