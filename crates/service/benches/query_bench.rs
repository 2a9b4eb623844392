use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use serde_json::json;
use service::query::{shape, translate, ListOptions, QueryParams};
use service::store::{DocumentStore, MemoryStore};
use models::Collection;

fn bench_list_listings(c: &mut Criterion) {
    let store = Arc::new(MemoryStore::new());
    let rt = tokio::runtime::Runtime::new().unwrap();

    // seed outside of the measured loop
    rt.block_on(async {
        for i in 0..2_000 {
            let careers = if i % 2 == 0 { vec!["Web Development"] } else { vec!["Business", "Other"] };
            let doc = models::document::to_document(&json!({
                "name": format!("Listing {i}"),
                "averageCost": (i % 50) * 500,
                "careers": careers,
                "createdAt": format!("2024-01-01T00:{:02}:{:02}Z", (i / 60) % 60, i % 60),
            }))
            .unwrap();
            store.create(Collection::Listings, doc).await.unwrap();
        }
    });

    let params: QueryParams = [
        ("averageCost[lte]", "10000"),
        ("careers[in]", "Web Development,Data Science"),
        ("sort", "-averageCost,name"),
        ("page", "3"),
        ("limit", "25"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    c.bench_function("shape_filtered_sorted_page", |b| {
        b.iter(|| {
            let filter = translate(&params).unwrap();
            let opts = ListOptions::from_params(&params);
            let page = rt.block_on(shape(store.as_ref(), Collection::Listings, &filter, &opts, &[])).unwrap();
            assert_eq!(page.count(), 25);
        });
    });
}

criterion_group!(benches, bench_list_listings);
criterion_main!(benches);
