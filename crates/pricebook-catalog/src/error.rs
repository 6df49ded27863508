//! Error types for the catalog service.
//!
//! [`CatalogError`] is the taxonomy callers see. Absence is reported as one
//! of the not-found variants and is never fatal; storage failures are
//! always surfaced, and by the time the caller sees one the failed
//! transaction has already been rolled back.

use pricebook_core::ConfigError;
use pricebook_db::DbError;
use pricebook_types::ProductId;

/// Errors returned by catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No live product exists for the id.
    #[error("product {product_id} not found")]
    ProductNotFound {
        /// The product that was looked up.
        product_id: ProductId,
    },

    /// The product has no history ledger entries.
    #[error("no history recorded for product {product_id}")]
    HistoryNotFound {
        /// The product whose ledger was queried.
        product_id: ProductId,
    },

    /// The supplied attributes were rejected before reaching the store.
    #[error("invalid product attributes: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Identifier allocation collided with an existing row.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Catalog settings could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CatalogError {
    /// Whether this error only signals absence.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProductNotFound { .. } | Self::HistoryNotFound { .. }
        )
    }
}

impl From<DbError> for CatalogError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { product_id } => Self::ProductNotFound { product_id },
            DbError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_not_found_maps_to_product_not_found() {
        let err = CatalogError::from(DbError::NotFound {
            product_id: ProductId(9),
        });
        assert!(matches!(
            err,
            CatalogError::ProductNotFound { product_id } if product_id == ProductId(9)
        ));
        assert!(err.is_not_found());
    }

    #[test]
    fn other_db_errors_are_storage_errors() {
        let err = CatalogError::from(DbError::Config("no url".to_owned()));
        assert!(matches!(err, CatalogError::Storage(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn conflict_is_preserved() {
        let err = CatalogError::from(DbError::Conflict("duplicate key".to_owned()));
        assert!(matches!(err, CatalogError::Conflict(ref msg) if msg == "duplicate key"));
    }
}
