use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use tracing::{debug, error};
use uuid::Uuid;

use models::{document::document_id, Collection, Document};

use super::{check_unique, ensure_id, merge_patch, DocumentStore};
use crate::errors::{ServiceError, ServiceResult};
use crate::query::filter::Filter;

type Collections = HashMap<Collection, Vec<Document>>;

/// In-process document store.
///
/// Documents keep insertion order per collection. When built with
/// [`MemoryStore::with_snapshot`] the whole store is written to a JSON file
/// after every mutation and reloaded on start. The snapshot is written while
/// the write lock is held, to a temp file that then replaces the old one.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
    file_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize the store from a snapshot path. Creates the file if missing.
    ///
    /// A file that exists but does not parse is an error; it is left untouched.
    pub async fn with_snapshot<P: Into<PathBuf>>(path: P) -> ServiceResult<Arc<Self>> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| snapshot_err(parent, e))?;
        }

        let collections = match fs::read(&file_path).await {
            Ok(bytes) => {
                let raw: HashMap<String, Vec<Document>> = serde_json::from_slice(&bytes).map_err(|e| {
                    error!(path = %file_path.display(), error = %e, "unreadable snapshot");
                    snapshot_err(&file_path, e)
                })?;
                Collection::ALL
                    .iter()
                    .map(|c| (*c, raw.get(c.as_str()).cloned().unwrap_or_default()))
                    .collect()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Collections::new(),
            Err(e) => return Err(snapshot_err(&file_path, e)),
        };

        let store = Self { inner: RwLock::new(collections), file_path: Some(file_path) };
        {
            let map = store.inner.write().await;
            store.persist(&map).await?;
        }
        Ok(Arc::new(store))
    }

    /// Write `map` to the snapshot file. Callers hold the write lock, so
    /// snapshots land in the same order as the mutations they capture.
    async fn persist(&self, map: &Collections) -> ServiceResult<()> {
        let Some(path) = &self.file_path else { return Ok(()) };
        let raw: HashMap<&str, &Vec<Document>> = map.iter().map(|(c, docs)| (c.as_str(), docs)).collect();
        let data = serde_json::to_vec(&raw).map_err(|e| ServiceError::Db(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data).await.map_err(|e| snapshot_err(&tmp, e))?;
        fs::rename(&tmp, path).await.map_err(|e| snapshot_err(path, e))?;
        debug!(path = %path.display(), "snapshot written");
        Ok(())
    }
}

fn snapshot_err(path: &Path, e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Db(format!("snapshot {}: {e}", path.display()))
}

fn position(docs: &[Document], id: Uuid) -> Option<usize> {
    docs.iter().position(|d| document_id(d) == Some(id))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> ServiceResult<Vec<Document>> {
        let map = self.inner.read().await;
        Ok(map
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> ServiceResult<Option<Document>> {
        let map = self.inner.read().await;
        Ok(map.get(&collection).and_then(|docs| position(docs, id).map(|i| docs[i].clone())))
    }

    async fn create(&self, collection: Collection, mut doc: Document) -> ServiceResult<Document> {
        let id = ensure_id(&mut doc)?;
        let mut map = self.inner.write().await;
        let docs = map.entry(collection).or_default();
        if position(docs, id).is_some() {
            return Err(ServiceError::DuplicateKey(format!("{collection}(id)")));
        }
        check_unique(collection, docs.iter(), &doc)?;
        docs.push(doc.clone());
        self.persist(&map).await?;
        Ok(doc)
    }

    async fn update_by_id(&self, collection: Collection, id: Uuid, patch: Document) -> ServiceResult<Document> {
        let mut map = self.inner.write().await;
        let docs = map.entry(collection).or_default();
        let idx = position(docs, id).ok_or_else(|| ServiceError::NotFound(format!("No document in {collection} with id of {id}")))?;
        let mut updated = docs[idx].clone();
        merge_patch(&mut updated, patch);
        check_unique(collection, docs.iter(), &updated)?;
        docs[idx] = updated.clone();
        self.persist(&map).await?;
        Ok(updated)
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> ServiceResult<Option<Document>> {
        let mut map = self.inner.write().await;
        let removed = map
            .get_mut(&collection)
            .and_then(|docs| position(docs, id).map(|i| docs.remove(i)));
        if removed.is_some() {
            self.persist(&map).await?;
        }
        Ok(removed)
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> ServiceResult<u64> {
        let mut map = self.inner.write().await;
        let removed = match map.get_mut(&collection) {
            Some(docs) => {
                let before = docs.len();
                docs.retain(|d| !filter.matches(d));
                (before - docs.len()) as u64
            }
            None => 0,
        };
        if removed > 0 {
            self.persist(&map).await?;
        }
        Ok(removed)
    }

    async fn count_all(&self, collection: Collection) -> ServiceResult<u64> {
        let map = self.inner.read().await;
        Ok(map.get(&collection).map(|d| d.len() as u64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Document {
        models::document::to_document(&v).unwrap()
    }

    #[tokio::test]
    async fn crud_round_trip() -> Result<(), anyhow::Error> {
        let store = MemoryStore::new();
        let created = store.create(Collection::Listings, doc(json!({"name": "Devworks"}))).await?;
        let id = document_id(&created).expect("id assigned");

        let found = store.find_by_id(Collection::Listings, id).await?.expect("found");
        assert_eq!(found["name"], "Devworks");

        let updated = store.update_by_id(Collection::Listings, id, doc(json!({"housing": true}))).await?;
        assert_eq!(updated["name"], "Devworks");
        assert_eq!(updated["housing"], true);

        assert_eq!(store.count_all(Collection::Listings).await?, 1);
        assert!(store.delete_by_id(Collection::Listings, id).await?.is_some());
        assert!(store.delete_by_id(Collection::Listings, id).await?.is_none());
        assert_eq!(store.count_all(Collection::Listings).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = MemoryStore::new();
        let res = store.update_by_id(Collection::Offerings, Uuid::new_v4(), Document::new()).await;
        assert!(matches!(res, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn unique_name_enforced_on_create_and_update() -> Result<(), anyhow::Error> {
        let store = MemoryStore::new();
        store.create(Collection::Listings, doc(json!({"name": "A"}))).await?;
        let b = store.create(Collection::Listings, doc(json!({"name": "B"}))).await?;
        assert!(matches!(
            store.create(Collection::Listings, doc(json!({"name": "A"}))).await,
            Err(ServiceError::DuplicateKey(_))
        ));
        let b_id = document_id(&b).unwrap();
        assert!(matches!(
            store.update_by_id(Collection::Listings, b_id, doc(json!({"name": "A"}))).await,
            Err(ServiceError::DuplicateKey(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn delete_many_removes_only_matches() -> Result<(), anyhow::Error> {
        let store = MemoryStore::new();
        for listing in ["a", "a", "b"] {
            store.create(Collection::Offerings, doc(json!({"listingId": listing}))).await?;
        }
        assert_eq!(store.delete_many(Collection::Offerings, &Filter::eq("listingId", "a")).await?, 2);
        assert_eq!(store.count_all(Collection::Offerings).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_survives_reload() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("memory_store_{}.json", Uuid::new_v4()));
        let store = MemoryStore::with_snapshot(&tmp).await?;
        store.create(Collection::Users, doc(json!({"email": "a@b.io"}))).await?;

        let reloaded = MemoryStore::with_snapshot(&tmp).await?;
        let users = reloaded.find(Collection::Users, &Filter::new()).await?;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["email"], "a@b.io");

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_snapshot_fails_and_is_kept() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("memory_store_{}.json", Uuid::new_v4()));
        let broken = br#"{"listings":[{"id":"7b1c","name":"Devworks"}],"users":[}"#;
        tokio::fs::write(&tmp, broken).await?;

        let res = MemoryStore::with_snapshot(&tmp).await;
        assert!(matches!(res, Err(ServiceError::Db(_))));
        assert_eq!(tokio::fs::read(&tmp).await?, broken.to_vec());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_writes_all_reach_the_snapshot() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("memory_store_{}.json", Uuid::new_v4()));
        let store = MemoryStore::with_snapshot(&tmp).await?;

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create(Collection::Offerings, doc(json!({ "cost": i }))).await })
            })
            .collect();
        for t in tasks {
            t.await??;
        }

        let reloaded = MemoryStore::with_snapshot(&tmp).await?;
        assert_eq!(reloaded.count_all(Collection::Offerings).await?, 16);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
