use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_document::Document;

/// Per-collection unique keys over jsonb body fields: (name, collection, key expressions).
const UNIQUE_KEYS: [(&str, &str, &str); 3] = [
    ("uq_document_listings_name", "listings", "(body->>'name')"),
    ("uq_document_users_email", "users", "(body->>'email')"),
    ("uq_document_reviews_listing_user", "reviews", "(body->>'listingId'), (body->>'userId')"),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Document: every store call is scoped to one collection
        manager
            .create_index(
                Index::create()
                    .name("idx_document_collection")
                    .table(Document::Table)
                    .col(Document::Collection)
                    .to_owned(),
            )
            .await?;

        // Document: default list order is newest first within a collection
        manager
            .create_index(
                Index::create()
                    .name("idx_document_collection_created")
                    .table(Document::Table)
                    .col(Document::Collection)
                    .col(Document::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Document: expression indexes are not expressible through the index builder
        let db = manager.get_connection();
        for (name, collection, keys) in UNIQUE_KEYS {
            db.execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {name} ON document ({keys}) WHERE collection = '{collection}'"
            ))
            .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for (name, _, _) in UNIQUE_KEYS {
            db.execute_unprepared(&format!("DROP INDEX IF EXISTS {name}")).await?;
        }
        manager
            .drop_index(Index::drop().name("idx_document_collection_created").table(Document::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_document_collection").table(Document::Table).to_owned())
            .await
    }
}
