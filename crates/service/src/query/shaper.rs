//! Result Shaper: turns a filtered collection into one page of documents plus
//! pagination metadata.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use models::document::{CREATED_AT_FIELD, ID_FIELD};
use models::{Collection, Document};

use super::filter::{compare_values, lookup, Condition, Filter, QueryParams};
use crate::errors::ServiceResult;
use crate::store::DocumentStore;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (field, descending) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        (!field.is_empty()).then(|| SortKey { field: field.to_string(), descending })
    }
}

/// Selection, ordering and window read from the reserved request keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    /// `None` returns every field.
    pub select: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub page: u64,
    pub limit: u64,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            select: None,
            sort: vec![SortKey { field: CREATED_AT_FIELD.to_string(), descending: true }],
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListOptions {
    /// Never fails: unparsable or non-positive `page`/`limit` fall back to defaults.
    pub fn from_params(params: &QueryParams) -> Self {
        let defaults = Self::default();
        let select = params.get("select").map(|raw| split_list(raw)).filter(|fields| !fields.is_empty());
        let sort: Vec<SortKey> = params
            .get("sort")
            .map(|raw| raw.split(',').filter_map(SortKey::parse).collect())
            .unwrap_or_default();
        Self {
            select,
            sort: if sort.is_empty() { defaults.sort } else { sort },
            page: positive(params.get("page")).unwrap_or(DEFAULT_PAGE),
            limit: positive(params.get("limit")).unwrap_or(DEFAULT_LIMIT),
        }
    }

    pub fn start_index(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

fn positive(raw: Option<&String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).filter(|n| *n > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub page: u64,
    pub limit: u64,
}

/// Neighbouring page links; each is omitted, not null, when it does not apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

impl Pagination {
    pub fn compute(opts: &ListOptions, total: u64) -> Self {
        let start = opts.start_index();
        Self {
            next: (start.saturating_add(opts.limit) < total).then(|| PageLink { page: opts.page + 1, limit: opts.limit }),
            prev: (start > 0).then(|| PageLink { page: opts.page - 1, limit: opts.limit }),
        }
    }
}

/// A related collection joined into each result under `field`.
#[derive(Debug, Clone)]
pub enum Populate {
    /// Follow `foreign_key` on the result to one record of `collection`,
    /// keeping only `select` (plus its id). Missing targets become null.
    One { field: &'static str, foreign_key: &'static str, collection: Collection, select: &'static [&'static str] },
    /// Every record of `collection` whose `foreign_key` equals the result's id.
    Many { field: &'static str, foreign_key: &'static str, collection: Collection },
}

impl Populate {
    fn field(&self) -> &'static str {
        match self {
            Populate::One { field, .. } | Populate::Many { field, .. } => *field,
        }
    }

    pub async fn apply(&self, store: &dyn DocumentStore, docs: &mut [Document]) -> ServiceResult<()> {
        match self {
            Populate::One { field, foreign_key, collection, select } => {
                let keys: Vec<String> = docs
                    .iter()
                    .filter_map(|d| d.get(*foreign_key).and_then(Value::as_str).map(String::from))
                    .collect();
                let related: HashMap<String, Document> = if keys.is_empty() {
                    HashMap::new()
                } else {
                    store
                        .find(*collection, &Filter::new().and(ID_FIELD, Condition::In(keys)))
                        .await?
                        .into_iter()
                        .filter_map(|d| id_of(&d).map(|id| (id, project(&d, select.iter().copied()))))
                        .collect()
                };
                for doc in docs.iter_mut() {
                    let joined = doc
                        .get(*foreign_key)
                        .and_then(Value::as_str)
                        .and_then(|k| related.get(k))
                        .map(|r| Value::Object(r.clone()))
                        .unwrap_or(Value::Null);
                    doc.insert(field.to_string(), joined);
                }
            }
            Populate::Many { field, foreign_key, collection } => {
                let ids: Vec<String> = docs.iter().filter_map(id_of).collect();
                let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
                if !ids.is_empty() {
                    let related = store.find(*collection, &Filter::new().and(*foreign_key, Condition::In(ids))).await?;
                    for r in related {
                        if let Some(key) = r.get(*foreign_key).and_then(Value::as_str).map(String::from) {
                            grouped.entry(key).or_default().push(Value::Object(r));
                        }
                    }
                }
                for doc in docs.iter_mut() {
                    let children = id_of(doc).and_then(|id| grouped.remove(&id)).unwrap_or_default();
                    doc.insert(field.to_string(), Value::Array(children));
                }
            }
        }
        Ok(())
    }
}

fn id_of(doc: &Document) -> Option<String> {
    doc.get(ID_FIELD).and_then(Value::as_str).map(String::from)
}

/// Keep only `fields`; the identity field is always kept.
fn project<'a>(doc: &Document, fields: impl IntoIterator<Item = &'a str>) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for field in fields {
        if let Some(v) = doc.get(field) {
            out.insert(field.to_string(), v.clone());
        }
    }
    out
}

/// Order documents by the sort keys, left to right.
pub fn sort_documents(docs: &mut [Document], keys: &[SortKey]) {
    docs.sort_by(|a, b| {
        keys.iter()
            .map(|k| {
                let ord = compare_values(lookup(a, &k.field), lookup(b, &k.field));
                if k.descending { ord.reverse() } else { ord }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

/// One page of results.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Document>,
    /// Size of the whole collection, not of the filtered subset.
    pub total: u64,
    pub pagination: Pagination,
}

impl Page {
    pub fn count(&self) -> usize {
        self.items.len()
    }
}

/// Run `filter` against `collection` and shape the result.
pub async fn shape(
    store: &dyn DocumentStore,
    collection: Collection,
    filter: &Filter,
    opts: &ListOptions,
    populate: &[Populate],
) -> ServiceResult<Page> {
    let mut docs = store.find(collection, filter).await?;
    sort_documents(&mut docs, &opts.sort);
    let total = store.count_all(collection).await?;

    let start = usize::try_from(opts.start_index()).unwrap_or(usize::MAX);
    let limit = usize::try_from(opts.limit).unwrap_or(usize::MAX);
    let mut items: Vec<Document> = docs.into_iter().skip(start).take(limit).collect();

    for p in populate {
        p.apply(store, &mut items).await?;
    }
    if let Some(select) = &opts.select {
        let mut keep: Vec<&str> = select.iter().map(String::as_str).collect();
        keep.extend(populate.iter().map(|p| -> &str { p.field() }));
        items = items.iter().map(|d| project(d, keep.iter().copied())).collect();
    }

    Ok(Page { items, total, pagination: Pagination::compute(opts, total) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    async fn seeded(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            let doc = models::document::to_document(&json!({
                "name": format!("L{i:02}"),
                "rank": i % 3,
                "createdAt": format!("2024-01-01T00:00:{i:02}Z"),
            }))
            .unwrap();
            store.create(Collection::Listings, doc).await.unwrap();
        }
        store
    }

    #[test]
    fn bad_page_and_limit_fall_back_to_defaults() {
        let opts = ListOptions::from_params(&params(&[("page", "abc"), ("limit", "0")]));
        assert_eq!((opts.page, opts.limit), (DEFAULT_PAGE, DEFAULT_LIMIT));
        assert_eq!(opts.sort, vec![SortKey { field: "createdAt".into(), descending: true }]);
        let opts = ListOptions::from_params(&params(&[("page", "-2"), ("limit", "7")]));
        assert_eq!((opts.page, opts.limit), (1, 7));
    }

    #[test]
    fn links_follow_window_position() {
        let opts = ListOptions { page: 3, limit: 10, ..Default::default() };
        let p = Pagination::compute(&opts, 25);
        assert_eq!(p.prev, Some(PageLink { page: 2, limit: 10 }));
        assert_eq!(p.next, None);
        let rendered = serde_json::to_value(&p).unwrap();
        assert!(rendered.get("next").is_none());

        let first = Pagination::compute(&ListOptions { page: 1, limit: 10, ..Default::default() }, 25);
        assert_eq!(first.next, Some(PageLink { page: 2, limit: 10 }));
        assert_eq!(first.prev, None);
    }

    #[tokio::test]
    async fn third_page_of_twenty_five() {
        let store = seeded(25).await;
        let opts = ListOptions::from_params(&params(&[("page", "3"), ("limit", "10")]));
        let page = shape(&store, Collection::Listings, &Filter::new(), &opts, &[]).await.unwrap();
        assert_eq!(page.count(), 5);
        assert_eq!(page.total, 25);
        assert_eq!(page.pagination.prev, Some(PageLink { page: 2, limit: 10 }));
        assert!(page.pagination.next.is_none());
        // default sort is newest first, so the last page holds the oldest
        assert_eq!(page.items[4]["name"], "L00");
    }

    #[tokio::test]
    async fn multi_key_sort_and_selection() {
        let store = seeded(6).await;
        let opts = ListOptions::from_params(&params(&[("sort", "rank,-name"), ("select", "name")]));
        let page = shape(&store, Collection::Listings, &Filter::new(), &opts, &[]).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["L03", "L00", "L04", "L01", "L05", "L02"]);
        let keys: Vec<&String> = page.items[0].keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(page.items[0].contains_key("id"));
    }

    #[tokio::test]
    async fn selection_keeps_joined_fields() {
        let store = seeded(3).await;
        for listing in store.find(Collection::Listings, &Filter::new()).await.unwrap() {
            let doc = models::document::to_document(&json!({"listingId": listing["id"], "cost": 100})).unwrap();
            store.create(Collection::Offerings, doc).await.unwrap();
        }
        let many = Populate::Many { field: "offerings", foreign_key: "listingId", collection: Collection::Offerings };
        let opts = ListOptions::from_params(&params(&[("select", "name")]));
        let page = shape(&store, Collection::Listings, &Filter::new(), &opts, &[many]).await.unwrap();
        for item in &page.items {
            let mut keys: Vec<&str> = item.keys().map(String::as_str).collect();
            keys.sort_unstable();
            assert_eq!(keys, ["id", "name", "offerings"]);
            assert_eq!(item["offerings"].as_array().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn total_counts_the_unfiltered_collection() {
        let store = seeded(5).await;
        let page = shape(&store, Collection::Listings, &Filter::eq("rank", 0), &ListOptions::default(), &[])
            .await
            .unwrap();
        assert_eq!(page.count(), 2);
        assert_eq!(page.total, 5);
    }

    #[tokio::test]
    async fn populate_joins_and_tolerates_missing_targets() {
        let store = MemoryStore::new();
        let listing = store
            .create(Collection::Listings, models::document::to_document(&json!({"name": "A", "description": "d", "phone": "1"})).unwrap())
            .await
            .unwrap();
        let listing_id = listing["id"].as_str().unwrap().to_string();
        for key in [listing_id.as_str(), "00000000-0000-0000-0000-000000000000"] {
            store
                .create(Collection::Offerings, models::document::to_document(&json!({"listingId": key})).unwrap())
                .await
                .unwrap();
        }

        let one = Populate::One { field: "listing", foreign_key: "listingId", collection: Collection::Listings, select: &["name", "description"] };
        let page = shape(&store, Collection::Offerings, &Filter::new(), &ListOptions::default(), &[one]).await.unwrap();
        let joined: Vec<&Value> = page.items.iter().map(|d| &d["listing"]).collect();
        assert!(joined.iter().any(|v| v.is_null()));
        let hit = joined.iter().find(|v| v.is_object()).unwrap();
        assert_eq!(hit["name"], "A");
        assert!(hit.get("phone").is_none());

        let many = Populate::Many { field: "offerings", foreign_key: "listingId", collection: Collection::Offerings };
        let page = shape(&store, Collection::Listings, &Filter::new(), &ListOptions::default(), &[many]).await.unwrap();
        assert_eq!(page.items[0]["offerings"].as_array().unwrap().len(), 1);
    }
}
