//! Schema migration entry point for pricebook.
//!
//! Loads configuration (`pricebook.toml`, `PRICEBOOK_*`, `DATABASE_URL`),
//! applies pending migrations and reports how many live products and
//! history entries the database holds.

use pricebook_catalog::PgCatalogStore;
use pricebook_core::CatalogConfig;
use pricebook_db::{HistoryStore, ProductStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, connection or a migration fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("pricebook-migrate starting");

    let config = CatalogConfig::load()?;
    info!(
        retention_days = config.history.retention_days,
        max_connections = config.database.max_connections,
        "Configuration loaded"
    );

    let store = PgCatalogStore::connect(&config.database).await?;
    store.migrate().await?;

    let pool = store.pool().pool();
    let products = ProductStore::new(pool).count().await?;
    let history = HistoryStore::new(pool).count().await?;
    info!(products, history, "Database ready");

    store.close().await;
    Ok(())
}
