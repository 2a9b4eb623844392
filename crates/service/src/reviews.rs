use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use models::document::{from_document, to_document};
use models::review::{Review, ReviewInput};
use models::user::Role;
use models::{Collection, Document};

use crate::errors::{ServiceError, ServiceResult};
use crate::guard::{ensure_can_mutate, ensure_role, Principal};
use crate::integrity::ensure_listing_exists;
use crate::offerings::WITH_LISTING;
use crate::query::{shape, translate, Filter, ListOptions, Page, QueryParams};
use crate::rollup::{self, AggregateKind, LISTING_REF_FIELD};
use crate::store::DocumentStore;

pub struct ReviewService {
    store: Arc<dyn DocumentStore>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self { Self { store } }

    pub async fn list(&self, params: &QueryParams) -> ServiceResult<Page> {
        let filter = translate(params)?;
        let opts = ListOptions::from_params(params);
        shape(self.store.as_ref(), Collection::Reviews, &filter, &opts, &[WITH_LISTING]).await
    }

    pub async fn list_for_listing(&self, listing_id: Uuid) -> ServiceResult<Vec<Document>> {
        ensure_listing_exists(self.store.as_ref(), listing_id).await?;
        self.store.find(Collection::Reviews, &Filter::eq(LISTING_REF_FIELD, listing_id)).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Document> {
        let mut docs = [self.load(id).await?];
        WITH_LISTING.apply(self.store.as_ref(), &mut docs).await?;
        let [doc] = docs;
        Ok(doc)
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Document> {
        self.store
            .find_by_id(Collection::Reviews, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("review", id))
    }

    /// One review per principal and listing; a second attempt is `DuplicateKey`.
    #[instrument(skip(self, input), fields(principal = %principal.id))]
    pub async fn create(&self, principal: &Principal, listing_id: Uuid, input: ReviewInput) -> ServiceResult<Document> {
        ensure_role(principal, &[Role::User, Role::Admin])?;
        ensure_listing_exists(self.store.as_ref(), listing_id).await?;

        let review = Review::create(input, listing_id, principal.id)?;
        let created = match self.store.create(Collection::Reviews, to_document(&review)?).await {
            Ok(doc) => doc,
            Err(ServiceError::DuplicateKey(key)) => {
                warn!(%listing_id, "second review by the same user rejected");
                return Err(ServiceError::DuplicateKey(key));
            }
            Err(e) => return Err(e),
        };
        info!(review_id = %review.id, %listing_id, rating = review.rating, "review_created");
        rollup::refresh(self.store.as_ref(), listing_id, AggregateKind::AverageRating).await;
        Ok(created)
    }

    #[instrument(skip(self, input), fields(principal = %principal.id))]
    pub async fn update(&self, principal: &Principal, id: Uuid, input: ReviewInput) -> ServiceResult<Document> {
        let mut review: Review = from_document(self.load(id).await?)?;
        ensure_can_mutate(principal, review.user_id, &format!("update review {id}"))?;
        review.apply(input)?;

        let updated = self.store.update_by_id(Collection::Reviews, id, to_document(&review)?).await?;
        info!(review_id = %id, "review_updated");
        rollup::refresh(self.store.as_ref(), review.listing_id, AggregateKind::AverageRating).await;
        Ok(updated)
    }

    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> ServiceResult<()> {
        let review: Review = from_document(self.load(id).await?)?;
        ensure_can_mutate(principal, review.user_id, &format!("delete review {id}"))?;
        self.store.delete_by_id(Collection::Reviews, id).await?;
        info!(review_id = %id, "review_deleted");
        rollup::refresh(self.store.as_ref(), review.listing_id, AggregateKind::AverageRating).await;
        Ok(())
    }
}
