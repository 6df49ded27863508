//! Shared type definitions for the pricebook product catalog.
//!
//! # Modules
//!
//! - [`ids`] -- Typed wrappers for product and history row keys
//! - [`structs`] -- Live products, validated input attributes, and history
//!   ledger records

pub mod ids;
pub mod structs;

pub use ids::{HistoryId, ProductId};
pub use structs::{
    HistoryRecord, PriceDuration, Product, ProductAttributes, ProductHistory, ValidityInterval,
};
