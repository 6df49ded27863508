//! History ledger persistence.
//!
//! `product_history` is append-only: rows are inserted by
//! [`HistoryStore::capture_snapshot`] inside an update transaction and are
//! never updated or deleted afterwards, not even when the product itself is
//! deleted. Every multi-row read carries an explicit `ORDER BY`; the
//! orderings match `pricebook_core::timeline`.

use chrono::{DateTime, Utc};
use pricebook_core::{RetentionWindow, snapshot_bounds};
use pricebook_types::{
    HistoryId, HistoryRecord, PriceDuration, ProductId, ValidityInterval,
};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;

/// Operations on the `product_history` table.
pub struct HistoryStore<'a> {
    pool: &'a PgPool,
}

impl<'a> HistoryStore<'a> {
    /// Create a new history store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append a snapshot of the product's current live row.
    ///
    /// Must run on the connection of the transaction that will overwrite
    /// the live row: the row is locked with `FOR UPDATE` so concurrent
    /// updates of the same product queue behind this one, and a rollback
    /// discards the snapshot together with the overwrite.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if there is no live row to snapshot,
    /// [`DbError::Validity`] if the interval cannot be computed, and
    /// [`DbError::Postgres`] if a statement fails.
    pub async fn capture_snapshot(
        conn: &mut PgConnection,
        product_id: ProductId,
        now: DateTime<Utc>,
        window: RetentionWindow,
    ) -> Result<HistoryRecord, DbError> {
        let locked: Option<i64> =
            sqlx::query_scalar(r"SELECT id FROM products WHERE id = $1 FOR UPDATE")
                .bind(product_id.into_inner())
                .fetch_optional(&mut *conn)
                .await?;
        if locked.is_none() {
            return Err(DbError::NotFound { product_id });
        }

        let latest_valid_from: Option<DateTime<Utc>> = sqlx::query_scalar(
            r"SELECT MAX(valid_from) FROM product_history WHERE product_id = $1",
        )
        .bind(product_id.into_inner())
        .fetch_one(&mut *conn)
        .await?;

        let bounds = snapshot_bounds(now, latest_valid_from, window)?;

        let row = sqlx::query_as::<_, HistoryRow>(
            r"INSERT INTO product_history (product_id, name, description, price, valid_from, valid_to, recorded_at)
              SELECT id, name, description, price, $2, $3, $4
              FROM products
              WHERE id = $1
              RETURNING history_id, product_id, name, description, price, valid_from, valid_to, recorded_at",
        )
        .bind(product_id.into_inner())
        .bind(bounds.valid_from)
        .bind(bounds.valid_to)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(DbError::from_write)?;

        tracing::debug!(
            %product_id,
            history_id = row.history_id,
            valid_from = %bounds.valid_from,
            valid_to = %bounds.valid_to,
            "Captured product snapshot"
        );

        Ok(row.into())
    }

    /// All ledger rows for a product, oldest `valid_from` first.
    ///
    /// Does not consult the live row, so history of deleted products is
    /// still returned.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn for_product(&self, product_id: ProductId) -> Result<Vec<HistoryRecord>, DbError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r"SELECT history_id, product_id, name, description, price, valid_from, valid_to, recorded_at
              FROM product_history
              WHERE product_id = $1
              ORDER BY valid_from, history_id",
        )
        .bind(product_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(HistoryRecord::from).collect())
    }

    /// Price and duration of the longest-held snapshot.
    ///
    /// Ties on duration go to the higher price, then to the latest row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn highest_price_duration(
        &self,
        product_id: ProductId,
    ) -> Result<Option<PriceDuration>, DbError> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            r"SELECT price, EXTRACT(EPOCH FROM (valid_to - valid_from))::BIGINT AS duration_secs
              FROM product_history
              WHERE product_id = $1
              ORDER BY (valid_to - valid_from) DESC, price DESC, history_id DESC
              LIMIT 1",
        )
        .bind(product_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(price, duration_secs)| PriceDuration {
            price,
            duration_secs,
        }))
    }

    /// The product's price timeline.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn validity_intervals(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ValidityInterval>, DbError> {
        let rows: Vec<(DateTime<Utc>, DateTime<Utc>, i64)> = sqlx::query_as(
            r"SELECT valid_from, valid_to, price
              FROM product_history
              WHERE product_id = $1
              ORDER BY valid_from, valid_to, history_id",
        )
        .bind(product_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(valid_from, valid_to, price)| ValidityInterval {
                valid_from,
                valid_to,
                price,
            })
            .collect())
    }

    /// The snapshot whose interval contains `instant`, bounds inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn state_at(
        &self,
        product_id: ProductId,
        instant: DateTime<Utc>,
    ) -> Result<Option<HistoryRecord>, DbError> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r"SELECT history_id, product_id, name, description, price, valid_from, valid_to, recorded_at
              FROM product_history
              WHERE product_id = $1 AND valid_from <= $2 AND valid_to >= $2
              ORDER BY valid_from DESC, history_id DESC
              LIMIT 1",
        )
        .bind(product_id.into_inner())
        .bind(instant)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(HistoryRecord::from))
    }

    /// Number of ledger rows for a product.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count_for_product(&self, product_id: ProductId) -> Result<i64, DbError> {
        let count: i64 =
            sqlx::query_scalar(r"SELECT COUNT(*) FROM product_history WHERE product_id = $1")
                .bind(product_id.into_inner())
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Total number of ledger rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(r"SELECT COUNT(*) FROM product_history")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// A row from the `product_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    /// Ledger row key.
    pub history_id: i64,
    /// Owning product.
    pub product_id: i64,
    /// Snapshot name.
    pub name: String,
    /// Snapshot description.
    pub description: String,
    /// Snapshot price.
    pub price: i64,
    /// Inclusive lower bound.
    pub valid_from: DateTime<Utc>,
    /// Inclusive upper bound.
    pub valid_to: DateTime<Utc>,
    /// When the row was written.
    pub recorded_at: DateTime<Utc>,
}

impl From<HistoryRow> for HistoryRecord {
    fn from(row: HistoryRow) -> Self {
        Self {
            history_id: HistoryId(row.history_id),
            product_id: ProductId(row.product_id),
            name: row.name,
            description: row.description,
            price: row.price,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            recorded_at: row.recorded_at,
        }
    }
}
