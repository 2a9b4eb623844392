use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use configs::AppConfig;
use service::store::{DocumentStore, MemoryStore};

struct TestApp {
    base_url: String,
    client: reqwest::Client,
}

/// Serve the real router over TCP on an ephemeral port, backed by a fresh memory store.
async fn start_server() -> anyhow::Result<TestApp> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let mut cfg = AppConfig::default();
    cfg.auth.jwt_secret = "e2e-secret".into();
    let app = server::startup::build_app(store, &cfg);

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = server::startup::serve(listener, app).await {
            eprintln!("server error: {e}");
        }
    });

    let client = reqwest::Client::builder().cookie_store(true).build()?;
    Ok(TestApp { base_url: format!("http://{addr}"), client })
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[tokio::test]
async fn cookie_session_round_trip() -> anyhow::Result<()> {
    let app = start_server().await?;

    let resp = app.client.get(app.url("/health")).send().await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);

    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({ "name": "Casey", "email": "casey@example.com", "password": "123456", "role": "publisher" }))
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);

    // The cookie set by register authenticates the next request without a bearer header.
    let resp = app
        .client
        .post(app.url("/listings"))
        .json(&json!({
            "name": "Cookie Coders",
            "description": "Backend bootcamp",
            "address": "1 Main St Springfield",
            "careers": ["Web Development"],
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::CREATED);
    let body: Value = resp.json().await?;
    assert_eq!(body["data"]["slug"], "cookie-coders");

    let resp = app.client.get(app.url("/auth/me")).send().await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);

    let resp = app.client.get(app.url("/auth/logout")).send().await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);

    let resp = app.client.get(app.url("/auth/me")).send().await?;
    assert_eq!(resp.status(), HttpStatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await?;
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn public_listing_reads() -> anyhow::Result<()> {
    let app = start_server().await?;
    let resp = app.client.get(app.url("/listings?sort=-name&limit=2")).send().await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 0);
    assert_eq!(body["data"], json!([]));
    Ok(())
}
