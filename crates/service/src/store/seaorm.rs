use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use models::document::{self as entity, CREATED_AT_FIELD, ID_FIELD};
use models::{Collection, Document};

use super::{ensure_id, merge_patch, DocumentStore};
use crate::errors::{ServiceError, ServiceResult};
use crate::query::filter::Filter;

/// Postgres-backed store: one `document` row per record, body in a jsonb column.
///
/// Filters are evaluated in process over the collection's rows, so request
/// values never reach SQL text. Unique indexes of [`Collection::unique_indexes`]
/// exist as partial expression indexes on the table, so concurrent writers
/// cannot both pass; the violation comes back as `DuplicateKey`.
pub struct SeaOrmDocumentStore {
    pub db: DatabaseConnection,
}

impl SeaOrmDocumentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn rows(&self, collection: Collection) -> ServiceResult<Vec<entity::Model>> {
        entity::Entity::find()
            .filter(entity::Column::Collection.eq(collection.as_str()))
            .order_by_asc(entity::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    async fn row(&self, collection: Collection, id: Uuid) -> ServiceResult<Option<entity::Model>> {
        entity::Entity::find_by_id(id)
            .filter(entity::Column::Collection.eq(collection.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)
    }
}

fn db_err(e: DbErr) -> ServiceError {
    ServiceError::Db(e.to_string())
}

/// Like [`db_err`], but unique-constraint violations become `DuplicateKey`.
fn write_err(collection: Collection, e: DbErr) -> ServiceError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            debug!(%collection, %detail, "unique constraint violated");
            ServiceError::DuplicateKey(format!("{collection}: {detail}"))
        }
        _ => db_err(e),
    }
}

fn body_of(row: entity::Model) -> ServiceResult<Document> {
    match row.body {
        Value::Object(mut doc) => {
            doc.entry(ID_FIELD.to_string()).or_insert_with(|| Value::String(row.id.to_string()));
            Ok(doc)
        }
        other => Err(ServiceError::Db(format!("document {} has a non-object body: {other}", row.id))),
    }
}

fn bodies(rows: Vec<entity::Model>) -> ServiceResult<Vec<Document>> {
    rows.into_iter().map(body_of).collect()
}

#[async_trait]
impl DocumentStore for SeaOrmDocumentStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> ServiceResult<Vec<Document>> {
        let docs = bodies(self.rows(collection).await?)?;
        Ok(docs.into_iter().filter(|d| filter.matches(d)).collect())
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> ServiceResult<Option<Document>> {
        self.row(collection, id).await?.map(body_of).transpose()
    }

    async fn create(&self, collection: Collection, mut doc: Document) -> ServiceResult<Document> {
        let id = ensure_id(&mut doc)?;

        let now = Utc::now().fixed_offset();
        let created_at = doc
            .get(CREATED_AT_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .unwrap_or(now);
        let am = entity::ActiveModel {
            id: Set(id),
            collection: Set(collection.as_str().to_string()),
            body: Set(Value::Object(doc.clone())),
            created_at: Set(created_at),
            updated_at: Set(now),
        };
        am.insert(&self.db).await.map_err(|e| write_err(collection, e))?;
        debug!(%collection, %id, "document inserted");
        Ok(doc)
    }

    async fn update_by_id(&self, collection: Collection, id: Uuid, patch: Document) -> ServiceResult<Document> {
        let row = self
            .row(collection, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No document in {collection} with id of {id}")))?;
        let mut updated = body_of(row.clone())?;
        merge_patch(&mut updated, patch);

        let mut am: entity::ActiveModel = row.into();
        am.body = Set(Value::Object(updated.clone()));
        am.updated_at = Set(Utc::now().fixed_offset());
        am.update(&self.db).await.map_err(|e| write_err(collection, e))?;
        Ok(updated)
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> ServiceResult<Option<Document>> {
        let Some(row) = self.row(collection, id).await? else { return Ok(None) };
        let doc = body_of(row)?;
        entity::Entity::delete_by_id(id).exec(&self.db).await.map_err(db_err)?;
        Ok(Some(doc))
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> ServiceResult<u64> {
        let ids: Vec<Uuid> = self
            .rows(collection)
            .await?
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                body_of(row).ok().filter(|d| filter.matches(d)).map(|_| id)
            })
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let res = entity::Entity::delete_many()
            .filter(entity::Column::Id.is_in(ids))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected)
    }

    async fn count_all(&self, collection: Collection) -> ServiceResult<u64> {
        entity::Entity::find()
            .filter(entity::Column::Collection.eq(collection.as_str()))
            .count(&self.db)
            .await
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use serde_json::json;

    #[tokio::test]
    async fn postgres_store_crud_and_uniqueness() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = match get_db().await {
            Ok(db) => db,
            Err(_) => return Ok(()),
        };
        let store = SeaOrmDocumentStore::new(db);

        let name = format!("Listing {}", Uuid::new_v4());
        let created = store
            .create(Collection::Listings, models::document::to_document(&json!({"name": name, "housing": true}))?)
            .await?;
        let id = models::document::document_id(&created).expect("id");

        let dup = store
            .create(Collection::Listings, models::document::to_document(&json!({"name": name}))?)
            .await;
        assert!(matches!(dup, Err(ServiceError::DuplicateKey(_))));

        let updated = store
            .update_by_id(Collection::Listings, id, models::document::to_document(&json!({"housing": false}))?)
            .await?;
        assert_eq!(updated["housing"], false);

        let found = store.find(Collection::Listings, &Filter::eq("name", &name)).await?;
        assert_eq!(found.len(), 1);

        assert!(store.delete_by_id(Collection::Listings, id).await?.is_some());
        assert!(store.find_by_id(Collection::Listings, id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_reviews_by_one_user_insert_once() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = match get_db().await {
            Ok(db) => db,
            Err(_) => return Ok(()),
        };
        let store = SeaOrmDocumentStore::new(db);
        let (listing_id, user_id) = (Uuid::new_v4().to_string(), Uuid::new_v4().to_string());
        let review = || models::document::to_document(&json!({"listingId": listing_id, "userId": user_id, "rating": 8}));

        let (a, b) = tokio::join!(
            store.create(Collection::Reviews, review()?),
            store.create(Collection::Reviews, review()?),
        );
        assert!(a.is_ok() != b.is_ok(), "exactly one insert should win");
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(loser, Err(ServiceError::DuplicateKey(_))));

        let stored = store
            .find(Collection::Reviews, &Filter::eq("listingId", &listing_id).and("userId", crate::query::Condition::Equals(user_id.clone())))
            .await?;
        assert_eq!(stored.len(), 1);
        store.delete_many(Collection::Reviews, &Filter::eq("listingId", &listing_id)).await?;
        Ok(())
    }
}
