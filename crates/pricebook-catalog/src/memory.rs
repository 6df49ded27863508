//! In-process catalog backend.
//!
//! Both tables live behind one `tokio` [`RwLock`]. An update computes its
//! complete [`WriteSet`] while holding the write lock and applies it only
//! after every step has succeeded, so a failure at any point leaves the
//! tables exactly as they were.
//!
//! [`MemoryStore::inject_fault`] arms a one-shot failure at a named point
//! of the update path, which lets tests prove that atomicity.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use pricebook_core::{RetentionWindow, snapshot_bounds, timeline};
use pricebook_types::{
    HistoryId, HistoryRecord, PriceDuration, Product, ProductAttributes, ProductId,
    ValidityInterval,
};
use tokio::sync::RwLock;

use crate::error::CatalogError;
use crate::store::CatalogStore;

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

/// A point on the update path where an injected fault can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// Before the history snapshot is staged.
    HistoryAppend,
    /// After the snapshot is staged, before the live row is rewritten.
    ProductWrite,
    /// After both writes are staged, before they are applied.
    Commit,
}

impl fmt::Display for FaultPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::HistoryAppend => "history_append",
            Self::ProductWrite => "product_write",
            Self::Commit => "commit",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    history: Vec<HistoryRecord>,
    next_product_id: i64,
    next_history_id: i64,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            products: BTreeMap::new(),
            history: Vec::new(),
            next_product_id: 1,
            next_history_id: 1,
        }
    }
}

impl Tables {
    fn ledger(&self, product_id: ProductId) -> Vec<HistoryRecord> {
        let mut records: Vec<HistoryRecord> = self
            .history
            .iter()
            .filter(|record| record.product_id == product_id)
            .cloned()
            .collect();
        timeline::sort_chronologically(&mut records);
        records
    }

    fn latest_valid_from(&self, product_id: ProductId) -> Option<DateTime<Utc>> {
        self.history
            .iter()
            .filter(|record| record.product_id == product_id)
            .map(|record| record.valid_from)
            .max()
    }
}

/// Writes staged by one update, applied all at once.
#[derive(Debug)]
struct WriteSet {
    snapshot: HistoryRecord,
    product: Product,
    next_history_id: i64,
}

impl WriteSet {
    fn apply(self, tables: &mut Tables) {
        tables.next_history_id = self.next_history_id;
        tables.history.push(self.snapshot);
        tables.products.insert(self.product.id, self.product);
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Catalog backend held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fault: Mutex<Option<FaultPoint>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a fault that fails the next update reaching `point`.
    ///
    /// The fault fires once and is then disarmed.
    pub fn inject_fault(&self, point: FaultPoint) {
        let mut armed = self.fault.lock().unwrap_or_else(PoisonError::into_inner);
        *armed = Some(point);
    }

    /// Total number of ledger rows across all products.
    pub async fn history_len(&self) -> usize {
        self.tables.read().await.history.len()
    }

    fn trip(&self, point: FaultPoint) -> Result<(), CatalogError> {
        let mut armed = self.fault.lock().unwrap_or_else(PoisonError::into_inner);
        if *armed == Some(point) {
            *armed = None;
            tracing::warn!(%point, "Injected storage fault");
            return Err(CatalogError::Storage(format!("injected fault at {point}")));
        }
        Ok(())
    }
}

impl CatalogStore for MemoryStore {
    async fn insert_product(
        &self,
        attrs: &ProductAttributes,
        now: DateTime<Utc>,
    ) -> Result<Product, CatalogError> {
        let mut tables = self.tables.write().await;

        let product_id = ProductId(tables.next_product_id);
        if tables.products.contains_key(&product_id) {
            return Err(CatalogError::Conflict(format!(
                "product id {product_id} already allocated"
            )));
        }
        let next = tables
            .next_product_id
            .checked_add(1)
            .ok_or_else(|| CatalogError::Storage("product id space exhausted".to_owned()))?;

        let product = Product {
            id: product_id,
            name: attrs.name.clone(),
            description: attrs.description.clone(),
            price: attrs.price,
            created_at: now,
            updated_at: now,
        };
        tables.next_product_id = next;
        tables.products.insert(product_id, product.clone());
        Ok(product)
    }

    async fn product(&self, product_id: ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.tables.read().await.products.get(&product_id).cloned())
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        attrs: &ProductAttributes,
        now: DateTime<Utc>,
        window: RetentionWindow,
    ) -> Result<HistoryRecord, CatalogError> {
        let mut tables = self.tables.write().await;

        let current = tables
            .products
            .get(&product_id)
            .cloned()
            .ok_or(CatalogError::ProductNotFound { product_id })?;

        self.trip(FaultPoint::HistoryAppend)?;
        let bounds = snapshot_bounds(now, tables.latest_valid_from(product_id), window)
            .map_err(|e| CatalogError::Storage(e.to_string()))?;
        let history_id = HistoryId(tables.next_history_id);
        let next_history_id = tables
            .next_history_id
            .checked_add(1)
            .ok_or_else(|| CatalogError::Storage("history id space exhausted".to_owned()))?;
        let snapshot = HistoryRecord {
            history_id,
            product_id,
            name: current.name.clone(),
            description: current.description.clone(),
            price: current.price,
            valid_from: bounds.valid_from,
            valid_to: bounds.valid_to,
            recorded_at: now,
        };

        self.trip(FaultPoint::ProductWrite)?;
        let product = Product {
            name: attrs.name.clone(),
            description: attrs.description.clone(),
            price: attrs.price,
            updated_at: current.updated_at.max(now),
            ..current
        };

        self.trip(FaultPoint::Commit)?;
        let writes = WriteSet {
            snapshot: snapshot.clone(),
            product,
            next_history_id,
        };
        writes.apply(&mut tables);
        Ok(snapshot)
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        tables
            .products
            .remove(&product_id)
            .map(|_| ())
            .ok_or(CatalogError::ProductNotFound { product_id })
    }

    async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn history(&self, product_id: ProductId) -> Result<Vec<HistoryRecord>, CatalogError> {
        Ok(self.tables.read().await.ledger(product_id))
    }

    async fn highest_price_duration(
        &self,
        product_id: ProductId,
    ) -> Result<Option<PriceDuration>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(timeline::highest_price_duration(&tables.ledger(product_id)))
    }

    async fn validity_intervals(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ValidityInterval>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(timeline::validity_intervals(&tables.ledger(product_id)))
    }

    async fn state_at(
        &self,
        product_id: ProductId,
        instant: DateTime<Utc>,
    ) -> Result<Option<HistoryRecord>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(timeline::state_at(&tables.ledger(product_id), instant).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap()
    }

    fn attrs(price: i64) -> ProductAttributes {
        ProductAttributes::new("Widget", "A great product", price)
    }

    #[tokio::test]
    async fn ids_are_allocated_in_order() {
        let store = MemoryStore::new();
        let a = store.insert_product(&attrs(1), t0()).await.unwrap();
        let b = store.insert_product(&attrs(2), t0()).await.unwrap();
        assert_eq!(a.id, ProductId(1));
        assert_eq!(b.id, ProductId(2));
    }

    #[tokio::test]
    async fn update_stages_snapshot_of_previous_state() {
        let store = MemoryStore::new();
        let product = store.insert_product(&attrs(100), t0()).await.unwrap();

        let snapshot = store
            .update_product(product.id, &attrs(150), t0(), RetentionWindow::default())
            .await
            .unwrap();

        assert_eq!(snapshot.history_id, HistoryId(1));
        assert_eq!(snapshot.price, 100);
        assert_eq!(snapshot.valid_to - snapshot.valid_from, TimeDelta::days(7));
        let live = store.product(product.id).await.unwrap().unwrap();
        assert_eq!(live.price, 150);
    }

    #[tokio::test]
    async fn every_fault_point_leaves_tables_untouched() {
        let later = t0() + TimeDelta::hours(1);
        for point in [
            FaultPoint::HistoryAppend,
            FaultPoint::ProductWrite,
            FaultPoint::Commit,
        ] {
            let store = MemoryStore::new();
            let product = store.insert_product(&attrs(100), t0()).await.unwrap();
            store.inject_fault(point);

            let result = store
                .update_product(product.id, &attrs(150), later, RetentionWindow::default())
                .await;
            assert!(matches!(result, Err(CatalogError::Storage(_))), "{point}");
            assert_eq!(store.history_len().await, 0, "{point}");
            assert_eq!(
                store.product(product.id).await.unwrap().unwrap(),
                product,
                "{point}"
            );

            // The fault is one-shot and the next history id was not consumed.
            let snapshot = store
                .update_product(product.id, &attrs(150), later, RetentionWindow::default())
                .await
                .unwrap();
            assert_eq!(snapshot.history_id, HistoryId(1), "{point}");
        }
    }

    #[tokio::test]
    async fn fault_is_not_consumed_by_missing_product() {
        let store = MemoryStore::new();
        store.inject_fault(FaultPoint::Commit);
        let missing = store
            .update_product(ProductId(42), &attrs(1), t0(), RetentionWindow::default())
            .await;
        assert!(matches!(missing, Err(CatalogError::ProductNotFound { .. })));

        let product = store.insert_product(&attrs(1), t0()).await.unwrap();
        let tripped = store
            .update_product(product.id, &attrs(2), t0(), RetentionWindow::default())
            .await;
        assert!(matches!(tripped, Err(CatalogError::Storage(_))));
    }

    #[tokio::test]
    async fn ledger_survives_delete() {
        let store = MemoryStore::new();
        let product = store.insert_product(&attrs(100), t0()).await.unwrap();
        store
            .update_product(product.id, &attrs(150), t0(), RetentionWindow::default())
            .await
            .unwrap();
        store.delete_product(product.id).await.unwrap();

        assert!(store.product(product.id).await.unwrap().is_none());
        let ledger = store.history(product.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].price, 100);
    }
}
