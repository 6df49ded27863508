//! Storage seam between the catalog service and a backend.
//!
//! The service owns the clock, the retention window, and input
//! validation; a [`CatalogStore`] owns persistence. Implementations must
//! make [`CatalogStore::update_product`] all-or-nothing: the history
//! snapshot and the live-row overwrite either both become visible or
//! neither does.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStore`](crate::memory::MemoryStore) -- in-process, with fault
//!   injection for atomicity tests
//! - [`PgCatalogStore`](crate::pg::PgCatalogStore) -- `PostgreSQL`

use std::future::Future;

use chrono::{DateTime, Utc};
use pricebook_core::RetentionWindow;
use pricebook_types::{
    HistoryRecord, PriceDuration, Product, ProductAttributes, ProductId, ValidityInterval,
};

use crate::error::CatalogError;

/// Persistence for live products and their history ledger.
pub trait CatalogStore: Send + Sync {
    /// Insert a product with `created_at = updated_at = now`.
    fn insert_product(
        &self,
        attrs: &ProductAttributes,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Product, CatalogError>> + Send;

    /// Fetch a live product.
    fn product(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, CatalogError>> + Send;

    /// Snapshot the live row into the ledger and overwrite it, atomically.
    ///
    /// Returns the captured snapshot, or
    /// [`CatalogError::ProductNotFound`] with nothing written.
    fn update_product(
        &self,
        product_id: ProductId,
        attrs: &ProductAttributes,
        now: DateTime<Utc>,
        window: RetentionWindow,
    ) -> impl Future<Output = Result<HistoryRecord, CatalogError>> + Send;

    /// Remove a live product, leaving its ledger untouched.
    fn delete_product(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), CatalogError>> + Send;

    /// All live products, ordered by id.
    fn products(&self) -> impl Future<Output = Result<Vec<Product>, CatalogError>> + Send;

    /// The product's ledger in chronological order, whether or not the
    /// product still exists.
    fn history(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Vec<HistoryRecord>, CatalogError>> + Send;

    /// Price and duration of the longest-held snapshot.
    fn highest_price_duration(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Option<PriceDuration>, CatalogError>> + Send;

    /// The product's price timeline.
    fn validity_intervals(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Vec<ValidityInterval>, CatalogError>> + Send;

    /// The snapshot valid at `instant`, bounds inclusive.
    fn state_at(
        &self,
        product_id: ProductId,
        instant: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<HistoryRecord>, CatalogError>> + Send;
}
