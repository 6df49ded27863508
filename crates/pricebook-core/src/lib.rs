//! Temporal-versioning core for the pricebook product catalog.
//!
//! Holds everything about history that does not depend on a storage
//! backend: where "now" comes from, how long a snapshot stays valid, and
//! which record each temporal query selects.
//!
//! # Modules
//!
//! - [`clock`] -- Injected wall clock ([`SystemClock`], [`ManualClock`])
//! - [`validity`] -- Retention window and snapshot interval policy
//! - [`timeline`] -- Ordering and selection rules for ledger queries
//! - [`config`] -- Layered configuration loading

pub mod clock;
pub mod config;
pub mod timeline;
pub mod validity;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CatalogConfig, ConfigError, DatabaseConfig, HistoryConfig};
pub use validity::{
    DEFAULT_RETENTION_DAYS, RetentionWindow, SnapshotBounds, ValidityError, snapshot_bounds,
};
