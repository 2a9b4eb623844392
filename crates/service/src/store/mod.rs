//! Document store collaborator.
//!
//! Every collection holds JSON object documents keyed by a uuid `id`. Two
//! backends implement [`DocumentStore`]: [`memory::MemoryStore`] (optionally
//! snapshotted to a JSON file) and [`seaorm::SeaOrmDocumentStore`] (Postgres).
//! Neither offers multi-document transactions.

pub mod memory;
pub mod seaorm;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use models::{document::ID_FIELD, Collection, Document};

use crate::errors::{ServiceError, ServiceResult};
use crate::query::filter::{lookup, Filter};

pub use memory::MemoryStore;
pub use seaorm::SeaOrmDocumentStore;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: Collection, filter: &Filter) -> ServiceResult<Vec<Document>>;
    async fn find_by_id(&self, collection: Collection, id: Uuid) -> ServiceResult<Option<Document>>;
    /// Insert a document, assigning an `id` when absent. Enforces unique indexes.
    async fn create(&self, collection: Collection, doc: Document) -> ServiceResult<Document>;
    /// Merge `patch` into the stored document; `NotFound` when it does not exist.
    async fn update_by_id(&self, collection: Collection, id: Uuid, patch: Document) -> ServiceResult<Document>;
    /// Remove a document and return it, `None` when it did not exist.
    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> ServiceResult<Option<Document>>;
    async fn delete_many(&self, collection: Collection, filter: &Filter) -> ServiceResult<u64>;
    async fn count_all(&self, collection: Collection) -> ServiceResult<u64>;

    /// Arithmetic mean of `field` across matching documents; `None` when no
    /// document carries a numeric value for it.
    async fn aggregate_mean(&self, collection: Collection, filter: &Filter, field: &str) -> ServiceResult<Option<f64>> {
        let docs = self.find(collection, filter).await?;
        Ok(mean_of(&docs, field))
    }
}

pub(crate) fn mean_of(docs: &[Document], field: &str) -> Option<f64> {
    let values: Vec<f64> = docs.iter().filter_map(|d| lookup(d, field).and_then(Value::as_f64)).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Make sure the document carries a uuid `id` and return it.
pub(crate) fn ensure_id(doc: &mut Document) -> ServiceResult<Uuid> {
    match doc.get(ID_FIELD) {
        None | Some(Value::Null) => {
            let id = Uuid::new_v4();
            doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            Ok(id)
        }
        Some(_) => models::document::document_id(doc)
            .ok_or_else(|| ServiceError::ValidationFailed("document id must be a uuid".into())),
    }
}

/// Shallow merge; the identity field is never overwritten.
pub(crate) fn merge_patch(target: &mut Document, patch: Document) {
    for (key, value) in patch {
        if key == ID_FIELD {
            continue;
        }
        target.insert(key, value);
    }
}

/// Reject `candidate` when another document shares all values of a unique index.
pub(crate) fn check_unique<'a>(
    collection: Collection,
    existing: impl IntoIterator<Item = &'a Document>,
    candidate: &Document,
) -> ServiceResult<()> {
    let candidate_id = candidate.get(ID_FIELD);
    let existing: Vec<&Document> = existing.into_iter().filter(|d| d.get(ID_FIELD) != candidate_id).collect();
    for index in collection.unique_indexes() {
        let key: Option<Vec<&Value>> = index
            .iter()
            .map(|field| candidate.get(*field).filter(|v| !v.is_null()))
            .collect();
        let Some(key) = key else { continue };
        let clash = existing.iter().any(|doc| {
            index.iter().zip(&key).all(|(field, value)| doc.get(*field) == Some(*value))
        });
        if clash {
            return Err(ServiceError::DuplicateKey(format!("{}({})", collection, index.join(", "))));
        }
    }
    Ok(())
}
