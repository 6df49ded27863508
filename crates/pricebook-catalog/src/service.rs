//! The catalog service.
//!
//! [`Catalog`] validates input, stamps every write from its [`Clock`], and
//! applies the configured retention window before delegating to a
//! [`CatalogStore`]. It is `Send + Sync` and meant to be shared behind an
//! `Arc`.

use chrono::{DateTime, Utc};
use pricebook_core::{CatalogConfig, Clock, RetentionWindow, SystemClock};
use pricebook_types::{
    HistoryRecord, PriceDuration, Product, ProductAttributes, ProductHistory, ProductId,
    ValidityInterval,
};
use validator::Validate;

use crate::error::CatalogError;
use crate::store::CatalogStore;

/// Product catalog with temporal price history.
#[derive(Debug)]
pub struct Catalog<S, C = SystemClock> {
    store: S,
    clock: C,
    retention: RetentionWindow,
}

impl<S: CatalogStore> Catalog<S> {
    /// A catalog on the system clock with the default retention window.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }

    /// A catalog on the system clock using the retention window from
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Config`] if the configured window is invalid.
    pub fn from_config(store: S, config: &CatalogConfig) -> Result<Self, CatalogError> {
        Ok(Self::new(store).with_retention(config.retention_window()?))
    }
}

impl<S: CatalogStore, C: Clock> Catalog<S, C> {
    /// A catalog driven by an explicit clock.
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            retention: RetentionWindow::default(),
        }
    }

    /// Replace the retention window applied to new snapshots.
    #[must_use]
    pub const fn with_retention(mut self, retention: RetentionWindow) -> Self {
        self.retention = retention;
        self
    }

    /// The backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The clock stamping writes.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// The retention window applied to new snapshots.
    pub const fn retention(&self) -> RetentionWindow {
        self.retention
    }

    // -----------------------------------------------------------------------
    // Live products
    // -----------------------------------------------------------------------

    /// Create a product and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for malformed attributes,
    /// [`CatalogError::Conflict`] on an id collision, or
    /// [`CatalogError::Storage`].
    pub async fn create_product(&self, attrs: &ProductAttributes) -> Result<ProductId, CatalogError> {
        attrs.validate()?;
        let product = self.store.insert_product(attrs, self.clock.now()).await?;
        tracing::info!(product_id = %product.id, price = product.price, "Product created");
        Ok(product.id)
    }

    /// The live product, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] if the read fails.
    pub async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, CatalogError> {
        self.store.product(product_id).await
    }

    /// Overwrite a product, first recording its current state in the
    /// history ledger.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for malformed attributes and
    /// [`CatalogError::ProductNotFound`] if the product does not exist. On
    /// [`CatalogError::Storage`] neither the ledger nor the product changed.
    pub async fn update_product(
        &self,
        product_id: ProductId,
        attrs: &ProductAttributes,
    ) -> Result<(), CatalogError> {
        attrs.validate()?;
        let now = self.clock.now();
        let snapshot = self
            .store
            .update_product(product_id, attrs, now, self.retention)
            .await
            .inspect_err(|e| {
                if !e.is_not_found() {
                    tracing::error!(%product_id, error = %e, "Product update rolled back");
                }
            })?;

        tracing::info!(
            %product_id,
            history_id = %snapshot.history_id,
            old_price = snapshot.price,
            new_price = attrs.price,
            valid_to = %snapshot.valid_to,
            "Product updated"
        );
        Ok(())
    }

    /// Delete a product. Its history stays in the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] if the product does not
    /// exist.
    pub async fn delete_product(&self, product_id: ProductId) -> Result<(), CatalogError> {
        self.store.delete_product(product_id).await?;
        tracing::info!(%product_id, "Product deleted, history retained");
        Ok(())
    }

    /// All live products ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] if the read fails.
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        let products = self.store.products().await?;
        tracing::debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    // -----------------------------------------------------------------------
    // History ledger
    // -----------------------------------------------------------------------

    /// The live product together with its ledger, oldest entry first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] once the product has been
    /// deleted, even though its ledger is retained (see
    /// [`ledger_entries`](Self::ledger_entries)).
    pub async fn product_history(&self, product_id: ProductId) -> Result<ProductHistory, CatalogError> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound { product_id })?;
        let history = self.store.history(product_id).await?;
        tracing::debug!(%product_id, entries = history.len(), "Loaded product history");
        Ok(ProductHistory { product, history })
    }

    /// Price and whole-second duration of the longest-held snapshot.
    ///
    /// Ties on duration go to the higher price.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::HistoryNotFound`] if the product has no
    /// ledger entries.
    pub async fn highest_price_duration(
        &self,
        product_id: ProductId,
    ) -> Result<PriceDuration, CatalogError> {
        self.store
            .highest_price_duration(product_id)
            .await?
            .ok_or(CatalogError::HistoryNotFound { product_id })
    }

    /// The product's price timeline ordered by `valid_from`, then
    /// `valid_to`. Empty if it was never updated.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] if the read fails.
    pub async fn validity_intervals(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ValidityInterval>, CatalogError> {
        self.store.validity_intervals(product_id).await
    }

    /// The recorded state whose interval contains `instant`, bounds
    /// inclusive. `None` when no snapshot covers it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] if the read fails.
    pub async fn state_at(
        &self,
        product_id: ProductId,
        instant: DateTime<Utc>,
    ) -> Result<Option<HistoryRecord>, CatalogError> {
        self.store.state_at(product_id, instant).await
    }

    /// Raw ledger entries, oldest first, whether or not the product still
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Storage`] if the read fails.
    pub async fn ledger_entries(&self, product_id: ProductId) -> Result<Vec<HistoryRecord>, CatalogError> {
        self.store.history(product_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, TimeZone};
    use pricebook_core::ManualClock;

    use super::*;
    use crate::memory::MemoryStore;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap()
    }

    fn catalog() -> (Catalog<MemoryStore, Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t0()));
        (Catalog::with_clock(MemoryStore::new(), Arc::clone(&clock)), clock)
    }

    #[tokio::test]
    async fn writes_are_stamped_from_the_clock() {
        let (catalog, clock) = catalog();
        let id = catalog
            .create_product(&ProductAttributes::new("Lamp", "", 10))
            .await
            .unwrap();

        let later = clock.advance(TimeDelta::minutes(5));
        catalog
            .update_product(id, &ProductAttributes::new("Lamp", "", 12))
            .await
            .unwrap();

        let product = catalog.get_product(id).await.unwrap().unwrap();
        assert_eq!(product.created_at, t0());
        assert_eq!(product.updated_at, later);
    }

    #[tokio::test]
    async fn retention_window_is_applied_to_snapshots() {
        let (catalog, _clock) = catalog();
        let catalog = catalog.with_retention(RetentionWindow::from_days(30).unwrap());
        let id = catalog
            .create_product(&ProductAttributes::new("Lamp", "", 10))
            .await
            .unwrap();
        catalog
            .update_product(id, &ProductAttributes::new("Lamp", "", 11))
            .await
            .unwrap();

        let entries = catalog.ledger_entries(id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.iter().all(|e| e.duration() == TimeDelta::days(30)));
    }

    #[tokio::test]
    async fn invalid_update_is_rejected_before_the_store() {
        let (catalog, _clock) = catalog();
        let id = catalog
            .create_product(&ProductAttributes::new("Lamp", "", 10))
            .await
            .unwrap();

        let result = catalog
            .update_product(id, &ProductAttributes::new("", "", 10))
            .await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
        assert!(catalog.ledger_entries(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn from_config_reads_retention() {
        let config = CatalogConfig::parse_toml("[history]\nretention_days = 3\n").unwrap();
        let catalog = Catalog::from_config(MemoryStore::new(), &config).unwrap();
        assert_eq!(catalog.retention().as_delta(), TimeDelta::days(3));
    }
}
