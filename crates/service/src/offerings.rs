use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use models::document::{from_document, to_document};
use models::listing::Listing;
use models::offering::{Offering, OfferingInput};
use models::user::Role;
use models::{Collection, Document};

use crate::errors::{ServiceError, ServiceResult};
use crate::guard::{ensure_can_mutate, ensure_role, Principal};
use crate::integrity::ensure_listing_exists;
use crate::query::{shape, translate, Filter, ListOptions, Page, Populate, QueryParams};
use crate::rollup::{self, AggregateKind, LISTING_REF_FIELD};
use crate::store::DocumentStore;

/// Joins the parent listing's name and description under `listing`.
pub const WITH_LISTING: Populate = Populate::One {
    field: "listing",
    foreign_key: LISTING_REF_FIELD,
    collection: Collection::Listings,
    select: &["name", "description"],
};

pub struct OfferingService {
    store: Arc<dyn DocumentStore>,
}

impl OfferingService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self { Self { store } }

    pub async fn list(&self, params: &QueryParams) -> ServiceResult<Page> {
        let filter = translate(params)?;
        let opts = ListOptions::from_params(params);
        shape(self.store.as_ref(), Collection::Offerings, &filter, &opts, &[WITH_LISTING]).await
    }

    /// Every offering of one listing, unpaginated. `NotFound` for an unknown listing.
    pub async fn list_for_listing(&self, listing_id: Uuid) -> ServiceResult<Vec<Document>> {
        ensure_listing_exists(self.store.as_ref(), listing_id).await?;
        self.store.find(Collection::Offerings, &Filter::eq(LISTING_REF_FIELD, listing_id)).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Document> {
        let doc = self.load(id).await?;
        let mut docs = [doc];
        WITH_LISTING.apply(self.store.as_ref(), &mut docs).await?;
        let [doc] = docs;
        Ok(doc)
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Document> {
        self.store
            .find_by_id(Collection::Offerings, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("offering", id))
    }

    /// Only the listing's owner (or an admin) may add offerings to it.
    #[instrument(skip(self, input), fields(principal = %principal.id))]
    pub async fn create(&self, principal: &Principal, listing_id: Uuid, input: OfferingInput) -> ServiceResult<Document> {
        ensure_role(principal, &[Role::Publisher, Role::Admin])?;
        let listing: Listing = from_document(ensure_listing_exists(self.store.as_ref(), listing_id).await?)?;
        ensure_can_mutate(principal, listing.created_by_user_id, &format!("add an offering to listing {listing_id}"))?;

        let offering = Offering::create(input, listing_id, principal.id)?;
        let created = self.store.create(Collection::Offerings, to_document(&offering)?).await?;
        info!(offering_id = %offering.id, %listing_id, cost = offering.cost, "offering_created");
        rollup::refresh(self.store.as_ref(), listing_id, AggregateKind::AverageCost).await;
        Ok(created)
    }

    #[instrument(skip(self, input), fields(principal = %principal.id))]
    pub async fn update(&self, principal: &Principal, id: Uuid, input: OfferingInput) -> ServiceResult<Document> {
        let mut offering: Offering = from_document(self.load(id).await?)?;
        ensure_can_mutate(principal, offering.created_by_user_id, &format!("update offering {id}"))?;
        offering.apply(input)?;

        let updated = self.store.update_by_id(Collection::Offerings, id, to_document(&offering)?).await?;
        info!(offering_id = %id, "offering_updated");
        rollup::refresh(self.store.as_ref(), offering.listing_id, AggregateKind::AverageCost).await;
        Ok(updated)
    }

    #[instrument(skip(self), fields(principal = %principal.id))]
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> ServiceResult<()> {
        let offering: Offering = from_document(self.load(id).await?)?;
        ensure_can_mutate(principal, offering.created_by_user_id, &format!("delete offering {id}"))?;
        self.store.delete_by_id(Collection::Offerings, id).await?;
        info!(offering_id = %id, "offering_deleted");
        rollup::refresh(self.store.as_ref(), offering.listing_id, AggregateKind::AverageCost).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::{tests::listing_input, ListingService};
    use crate::store::MemoryStore;
    use models::document::document_id;

    fn offering_input(cost: f64) -> OfferingInput {
        OfferingInput {
            title: Some("Front End Web Development".into()),
            description: Some("HTML, CSS and JavaScript".into()),
            weeks: Some("8".into()),
            cost: Some(cost),
            minimum_skill: Some("beginner".into()),
            scholarships_available: None,
        }
    }

    struct Fixture {
        store: Arc<dyn DocumentStore>,
        svc: OfferingService,
        owner: Principal,
        listing_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let owner = Principal::new(Uuid::new_v4(), Role::Publisher);
        let listing = ListingService::new(store.clone()).create(&owner, listing_input("Devworks")).await.unwrap();
        let listing_id = document_id(&listing).unwrap();
        Fixture { svc: OfferingService::new(store.clone()), store, owner, listing_id }
    }

    async fn average_cost(f: &Fixture) -> serde_json::Value {
        let listing = f.store.find_by_id(Collection::Listings, f.listing_id).await.unwrap().unwrap();
        listing.get("averageCost").cloned().unwrap_or(serde_json::Value::Null)
    }

    #[tokio::test]
    async fn writes_keep_average_cost_current() {
        let f = fixture().await;
        let a = f.svc.create(&f.owner, f.listing_id, offering_input(100.0)).await.unwrap();
        let b = f.svc.create(&f.owner, f.listing_id, offering_input(250.0)).await.unwrap();
        assert_eq!(average_cost(&f).await, 180.0);

        let b_id = document_id(&b).unwrap();
        f.svc.update(&f.owner, b_id, OfferingInput { cost: Some(300.0), ..Default::default() }).await.unwrap();
        assert_eq!(average_cost(&f).await, 200.0);

        f.svc.delete(&f.owner, b_id).await.unwrap();
        assert_eq!(average_cost(&f).await, 100.0);
        f.svc.delete(&f.owner, document_id(&a).unwrap()).await.unwrap();
        assert!(average_cost(&f).await.is_null());
    }

    #[tokio::test]
    async fn unknown_listing_creates_nothing() {
        let f = fixture().await;
        let admin = Principal::new(Uuid::new_v4(), Role::Admin);
        let res = f.svc.create(&admin, Uuid::new_v4(), offering_input(100.0)).await;
        assert!(matches!(res, Err(ServiceError::NotFound(_))));
        assert_eq!(f.store.count_all(Collection::Offerings).await.unwrap(), 0);
        assert!(matches!(f.svc.list_for_listing(Uuid::new_v4()).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_mutate() {
        let f = fixture().await;
        let created = f.svc.create(&f.owner, f.listing_id, offering_input(100.0)).await.unwrap();
        let id = document_id(&created).unwrap();

        let stranger = Principal::new(Uuid::new_v4(), Role::Publisher);
        assert!(matches!(f.svc.create(&stranger, f.listing_id, offering_input(1.0)).await, Err(ServiceError::Unauthorized(_))));
        assert!(matches!(f.svc.delete(&stranger, id).await, Err(ServiceError::Unauthorized(_))));

        let admin = Principal::new(Uuid::new_v4(), Role::Admin);
        f.svc.update(&admin, id, OfferingInput { weeks: Some("10".into()), ..Default::default() }).await.unwrap();
        f.svc.delete(&admin, id).await.unwrap();
    }

    #[tokio::test]
    async fn single_offering_carries_listing_summary() {
        let f = fixture().await;
        let created = f.svc.create(&f.owner, f.listing_id, offering_input(100.0)).await.unwrap();
        let doc = f.svc.get(document_id(&created).unwrap()).await.unwrap();
        assert_eq!(doc["listing"]["name"], "Devworks");
        assert!(doc["listing"].get("address").is_none());
        assert_eq!(f.svc.list_for_listing(f.listing_id).await.unwrap().len(), 1);
    }
}
