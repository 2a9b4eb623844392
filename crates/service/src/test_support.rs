#![cfg(test)]
use tokio::sync::OnceCell;
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use configs::DatabaseConfig;
use models::db::connect_with_config;

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

fn test_config(max_connections: u32) -> DatabaseConfig {
    let mut cfg = DatabaseConfig::default();
    cfg.normalize_from_env();
    cfg.max_connections = max_connections;
    cfg.min_connections = 1;
    cfg.connect_timeout_secs = 5;
    cfg.acquire_timeout_secs = 10;
    cfg
}

/// Connect to the test database, migrating it on first use.
/// Errors when `DATABASE_URL` is unset or the server is unreachable.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    if std::env::var("DATABASE_URL").is_err() {
        anyhow::bail!("DATABASE_URL not set");
    }
    let migrated = *MIGRATED
        .get_or_init(|| async {
            match connect_with_config(&test_config(2)).await {
                Ok(db) => migration::Migrator::up(&db, None).await.is_ok(),
                Err(_) => false,
            }
        })
        .await;
    if !migrated {
        anyhow::bail!("test database unavailable");
    }
    connect_with_config(&test_config(10)).await
}
