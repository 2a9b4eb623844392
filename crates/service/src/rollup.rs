//! Aggregate Rollup Engine.
//!
//! Keeps `averageCost` and `averageRating` on a listing equal to the mean of its
//! current offerings and reviews. Write paths call [`refresh`] explicitly after a
//! dependent mutation has been persisted.

use serde_json::Value;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use models::{Collection, Document};

use crate::errors::{ServiceError, ServiceResult};
use crate::query::filter::Filter;
use crate::store::DocumentStore;

pub const LISTING_REF_FIELD: &str = "listingId";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateKind {
    AverageCost,
    AverageRating,
}

impl AggregateKind {
    /// Derived field written on the listing.
    pub fn target_field(&self) -> &'static str {
        match self {
            AggregateKind::AverageCost => "averageCost",
            AggregateKind::AverageRating => "averageRating",
        }
    }

    /// Dependent collection and the numeric field averaged over it.
    pub fn source(&self) -> (Collection, &'static str) {
        match self {
            AggregateKind::AverageCost => (Collection::Offerings, "cost"),
            AggregateKind::AverageRating => (Collection::Reviews, "rating"),
        }
    }

    /// Cost rounds up to a multiple of 10; rating rounds to one decimal.
    pub fn round(&self, mean: f64) -> f64 {
        match self {
            AggregateKind::AverageCost => (mean / 10.0).ceil() * 10.0,
            AggregateKind::AverageRating => (mean * 10.0).round() / 10.0,
        }
    }
}

/// Recompute one derived field of `listing_id` and write it back.
///
/// With no dependents left the field is set to null. Returns the stored value.
#[instrument(skip(store), fields(field = kind.target_field()))]
pub async fn recompute(store: &dyn DocumentStore, listing_id: Uuid, kind: AggregateKind) -> ServiceResult<Option<f64>> {
    let (collection, field) = kind.source();
    let mean = store
        .aggregate_mean(collection, &Filter::eq(LISTING_REF_FIELD, listing_id), field)
        .await
        .map_err(|e| ServiceError::UpstreamFailure(format!("aggregate over {collection}: {e}")))?;
    let value = mean.map(|m| kind.round(m));

    let mut patch = Document::new();
    patch.insert(kind.target_field().to_string(), value.map(Value::from).unwrap_or(Value::Null));
    store
        .update_by_id(Collection::Listings, listing_id, patch)
        .await
        .map_err(|e| ServiceError::UpstreamFailure(format!("write {} on listing {listing_id}: {e}", kind.target_field())))?;
    debug!(%listing_id, ?value, "rollup stored");
    Ok(value)
}

/// Best-effort [`recompute`]: failures are logged and counted, never returned,
/// so the dependent write that triggered the rollup still succeeds.
pub async fn refresh(store: &dyn DocumentStore, listing_id: Uuid, kind: AggregateKind) {
    let outcome = recompute(store, listing_id, kind).await;
    if let Err(e) = &outcome {
        error!(%listing_id, field = kind.target_field(), error = %e, "rollup failed");
    }
    common::metrics::record_rollup(kind.target_field(), outcome.is_ok());
}
