use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use migration::{Migrator, MigratorTrait};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use configs::{AppConfig, StoreBackend};
use service::store::{DocumentStore, MemoryStore, SeaOrmDocumentStore};

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load `config.toml` (or `CONFIG_PATH`), falling back to environment variables
/// when no file is present.
pub fn load_config() -> Result<AppConfig, StartupError> {
    let mut cfg = match AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            info!(error = %e, "no usable config file, reading environment");
            AppConfig::from_env()
        }
    };
    cfg.normalize_and_validate()
        .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    if cfg.auth.uses_dev_secret() {
        warn!("JWT_SECRET not set, signing tokens with the development secret");
    }
    Ok(cfg)
}

/// Open the configured document store; Postgres is migrated before use.
pub async fn build_store(cfg: &AppConfig) -> Result<Arc<dyn DocumentStore>, StartupError> {
    match cfg.store.backend {
        StoreBackend::Memory => match &cfg.store.data_file {
            Some(path) => {
                let store: Arc<dyn DocumentStore> =
                    MemoryStore::with_snapshot(path).await.map_err(anyhow::Error::from)?;
                info!(path = %path, "memory store with snapshot");
                Ok(store)
            }
            None => {
                info!("memory store, data is not persisted");
                Ok(Arc::new(MemoryStore::new()))
            }
        },
        StoreBackend::Postgres => {
            let db = models::db::connect_with_config(&cfg.database).await?;
            Migrator::up(&db, None).await.map_err(anyhow::Error::from)?;
            info!("postgres store migrated");
            Ok(Arc::new(SeaOrmDocumentStore::new(db)))
        }
    }
}

/// Build the application for a given store.
pub fn build_app(store: Arc<dyn DocumentStore>, cfg: &AppConfig) -> Router {
    routes::build_router(AppState::new(store, &cfg.auth), build_cors())
}

/// Serve `app` on an already bound listener until the process stops.
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app).await?;
    Ok(())
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    common::utils::logging::init_logging_from_env();

    let cfg = load_config()?;
    let store = build_store(&cfg).await?;
    let app = build_app(store, &cfg);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, backend = ?cfg.store.backend, "listings api listening");
    serve(listener, app).await
}
