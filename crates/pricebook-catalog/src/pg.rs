//! `PostgreSQL` catalog backend.
//!
//! A thin adapter from [`CatalogStore`] onto the `pricebook-db` stores. The
//! transactional update lives in [`ProductStore::update`].

use chrono::{DateTime, Utc};
use pricebook_core::{DatabaseConfig, RetentionWindow};
use pricebook_db::{HistoryStore, PostgresConfig, PostgresPool, ProductStore};
use pricebook_types::{
    HistoryRecord, PriceDuration, Product, ProductAttributes, ProductId, ValidityInterval,
};

use crate::error::CatalogError;
use crate::store::CatalogStore;

/// Catalog backend over a `PostgreSQL` connection pool.
pub struct PgCatalogStore {
    pool: PostgresPool,
}

impl PgCatalogStore {
    /// Wrap an existing pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    /// Connect using the `[database]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] if no URL is configured or the
    /// connection fails.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, CatalogError> {
        let pg_config = PostgresConfig::from_database_config(config)?;
        let pool = PostgresPool::connect(&pg_config).await?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), CatalogError> {
        self.pool.run_migrations().await?;
        Ok(())
    }

    /// The underlying pool.
    pub const fn pool(&self) -> &PostgresPool {
        &self.pool
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn products_table(&self) -> ProductStore<'_> {
        ProductStore::new(self.pool.pool())
    }

    const fn history_table(&self) -> HistoryStore<'_> {
        HistoryStore::new(self.pool.pool())
    }
}

impl CatalogStore for PgCatalogStore {
    async fn insert_product(
        &self,
        attrs: &ProductAttributes,
        now: DateTime<Utc>,
    ) -> Result<Product, CatalogError> {
        Ok(self.products_table().create(attrs, now).await?)
    }

    async fn product(&self, product_id: ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.products_table().get(product_id).await?)
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        attrs: &ProductAttributes,
        now: DateTime<Utc>,
        window: RetentionWindow,
    ) -> Result<HistoryRecord, CatalogError> {
        Ok(self
            .products_table()
            .with_retention(window)
            .update(product_id, attrs, now)
            .await?)
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<(), CatalogError> {
        Ok(self.products_table().delete(product_id).await?)
    }

    async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products_table().list().await?)
    }

    async fn history(&self, product_id: ProductId) -> Result<Vec<HistoryRecord>, CatalogError> {
        Ok(self.history_table().for_product(product_id).await?)
    }

    async fn highest_price_duration(
        &self,
        product_id: ProductId,
    ) -> Result<Option<PriceDuration>, CatalogError> {
        Ok(self.history_table().highest_price_duration(product_id).await?)
    }

    async fn validity_intervals(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ValidityInterval>, CatalogError> {
        Ok(self.history_table().validity_intervals(product_id).await?)
    }

    async fn state_at(
        &self,
        product_id: ProductId,
        instant: DateTime<Utc>,
    ) -> Result<Option<HistoryRecord>, CatalogError> {
        Ok(self.history_table().state_at(product_id, instant).await?)
    }
}
