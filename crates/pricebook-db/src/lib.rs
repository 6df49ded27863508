//! `PostgreSQL` data layer for the pricebook product catalog.
//!
//! # Architecture
//!
//! ```text
//! update(product, attrs)
//!     |
//!     +-- BEGIN
//!     |-- HistoryStore::capture_snapshot  (lock live row, append ledger row)
//!     |-- ProductStore::overwrite         (new attributes, updated_at)
//!     +-- COMMIT  (any error: ROLLBACK, neither write visible)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`product_store`] -- Live product rows
//! - [`history_store`] -- Append-only history ledger and temporal queries
//! - [`error`] -- Shared error types

pub mod error;
pub mod history_store;
pub mod postgres;
pub mod product_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use history_store::{HistoryRow, HistoryStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use product_store::{ProductRow, ProductStore};
