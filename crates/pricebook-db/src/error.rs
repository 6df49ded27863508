//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors with additional context about which operation failed.

use pricebook_core::ValidityError;
use pricebook_types::ProductId;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// No live product row exists for the id.
    #[error("product {product_id} not found")]
    NotFound {
        /// The product that was looked up.
        product_id: ProductId,
    },

    /// An insert collided with an existing key.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Snapshot bounds could not be computed.
    #[error("validity error: {0}")]
    Validity(#[from] ValidityError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Classify a write error, surfacing unique-key violations as
    /// [`DbError::Conflict`].
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::Conflict(db_err.message().to_owned());
            }
        }
        Self::Postgres(err)
    }
}
