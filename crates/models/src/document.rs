//! Storage shape shared by every collection: a JSON object keyed by `id`.
//!
//! The Postgres backend keeps one row per document in the `document` table;
//! the in-memory backend keeps the same maps in process.

use sea_orm::entity::prelude::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ModelError;

pub type Document = serde_json::Map<String, Value>;

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub collection: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub body: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}

/// Named document collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Listings,
    Offerings,
    Reviews,
    Users,
    Credentials,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Listings,
        Collection::Offerings,
        Collection::Reviews,
        Collection::Users,
        Collection::Credentials,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Listings => "listings",
            Collection::Offerings => "offerings",
            Collection::Reviews => "reviews",
            Collection::Users => "users",
            Collection::Credentials => "credentials",
        }
    }

    /// Field groups whose combined values must be unique within the collection.
    pub fn unique_indexes(&self) -> &'static [&'static [&'static str]] {
        match self {
            Collection::Listings => &[&["name"]],
            Collection::Users => &[&["email"]],
            Collection::Reviews => &[&["listingId", "userId"]],
            Collection::Offerings | Collection::Credentials => &[],
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, ModelError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ModelError::Serde(format!("expected an object, got {other}"))),
        Err(e) => Err(ModelError::Serde(e.to_string())),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, ModelError> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| ModelError::Serde(e.to_string()))
}

pub fn document_id(doc: &Document) -> Option<Uuid> {
    doc.get(ID_FIELD).and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_id_reads_uuid_strings_only() {
        let id = Uuid::new_v4();
        let doc = to_document(&json!({"id": id.to_string()})).unwrap();
        assert_eq!(document_id(&doc), Some(id));
        let bad = to_document(&json!({"id": 5})).unwrap();
        assert_eq!(document_id(&bad), None);
    }

    #[test]
    fn scalars_are_not_documents() {
        assert!(to_document(&json!([1, 2])).is_err());
    }
}
