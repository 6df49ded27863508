//! Live product persistence.
//!
//! [`ProductStore::update`] is the only write that touches both tables:
//! it snapshots the live row into the history ledger and overwrites it in
//! one transaction, so either both writes land or neither does.

use chrono::{DateTime, Utc};
use pricebook_core::RetentionWindow;
use pricebook_types::{HistoryRecord, Product, ProductAttributes, ProductId};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::history_store::HistoryStore;

/// Operations on the `products` table.
pub struct ProductStore<'a> {
    pool: &'a PgPool,
    retention: RetentionWindow,
}

impl<'a> ProductStore<'a> {
    /// Create a new product store bound to a connection pool, using the
    /// default retention window for snapshots.
    pub fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            retention: RetentionWindow::default(),
        }
    }

    /// Set the retention window applied to snapshots taken on update.
    #[must_use]
    pub const fn with_retention(mut self, retention: RetentionWindow) -> Self {
        self.retention = retention;
        self
    }

    /// Insert a product with `created_at = updated_at = now`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] if the allocated id already exists,
    /// or [`DbError::Postgres`] if the insert fails.
    pub async fn create(
        &self,
        attrs: &ProductAttributes,
        now: DateTime<Utc>,
    ) -> Result<Product, DbError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"INSERT INTO products (name, description, price, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $4)
              RETURNING id, name, description, price, created_at, updated_at",
        )
        .bind(&attrs.name)
        .bind(&attrs.description)
        .bind(attrs.price)
        .bind(now)
        .fetch_one(self.pool)
        .await
        .map_err(DbError::from_write)?;

        tracing::info!(product_id = row.id, price = row.price, "Created product");
        Ok(row.into())
    }

    /// Fetch the live row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, product_id: ProductId) -> Result<Option<Product>, DbError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"SELECT id, name, description, price, created_at, updated_at
              FROM products
              WHERE id = $1",
        )
        .bind(product_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Snapshot the live row into the ledger, then overwrite it.
    ///
    /// Returns the captured snapshot. Dropping the returned future before
    /// it completes drops the open transaction, which rolls back.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the product does not exist. Any
    /// error rolls back both writes.
    pub async fn update(
        &self,
        product_id: ProductId,
        attrs: &ProductAttributes,
        now: DateTime<Utc>,
    ) -> Result<HistoryRecord, DbError> {
        let mut tx = self.pool.begin().await?;

        let snapshot =
            HistoryStore::capture_snapshot(&mut *tx, product_id, now, self.retention).await?;
        Self::overwrite(&mut *tx, product_id, attrs, now).await?;

        tx.commit().await?;

        tracing::info!(
            %product_id,
            history_id = %snapshot.history_id,
            old_price = snapshot.price,
            new_price = attrs.price,
            "Updated product"
        );
        Ok(snapshot)
    }

    /// Overwrite the mutable columns of a live row on an open connection.
    ///
    /// `updated_at` never moves backwards. Exposed so callers composing
    /// their own transaction can pair it with
    /// [`HistoryStore::capture_snapshot`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no row was updated, or
    /// [`DbError::Postgres`] if the statement fails (for example a
    /// negative price tripping `products_price_non_negative`).
    pub async fn overwrite(
        conn: &mut PgConnection,
        product_id: ProductId,
        attrs: &ProductAttributes,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE products
              SET name = $2, description = $3, price = $4, updated_at = GREATEST(updated_at, $5)
              WHERE id = $1",
        )
        .bind(product_id.into_inner())
        .bind(&attrs.name)
        .bind(&attrs.description)
        .bind(attrs.price)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound { product_id });
        }
        Ok(())
    }

    /// Delete the live row. The product's history is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the product does not exist.
    pub async fn delete(&self, product_id: ProductId) -> Result<(), DbError> {
        let result = sqlx::query(r"DELETE FROM products WHERE id = $1")
            .bind(product_id.into_inner())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound { product_id });
        }

        tracing::info!(%product_id, "Deleted product (history retained)");
        Ok(())
    }

    /// All live products, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, DbError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"SELECT id, name, description, price, created_at, updated_at
              FROM products
              ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Number of live products.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(r"SELECT COUNT(*) FROM products")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    /// Product key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Price in minor currency units.
    pub price: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
