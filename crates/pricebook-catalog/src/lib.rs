//! Product catalog with an append-only, time-versioned price history.
//!
//! Every update first records the product's previous state in a history
//! ledger, stamped with a bounded validity interval, and then overwrites
//! the live row, as one atomic unit. Deleting a product leaves its ledger
//! in place.
//!
//! ```text
//! Catalog<S, C>            validation, clock, retention window
//!     |
//!     +-- CatalogStore     MemoryStore | PgCatalogStore
//! ```
//!
//! # Modules
//!
//! - [`service`] -- The [`Catalog`] operations
//! - [`store`] -- The [`CatalogStore`] backend seam
//! - [`memory`] -- In-process backend with fault injection
//! - [`pg`] -- `PostgreSQL` backend
//! - [`error`] -- Caller-facing error taxonomy

pub mod error;
pub mod memory;
pub mod pg;
pub mod service;
pub mod store;

pub use error::CatalogError;
pub use memory::{FaultPoint, MemoryStore};
pub use pg::PgCatalogStore;
pub use service::Catalog;
pub use store::CatalogStore;
