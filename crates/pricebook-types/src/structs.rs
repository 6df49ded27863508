//! Product and history ledger structs.
//!
//! [`Product`] is the live row; [`HistoryRecord`] is an immutable snapshot
//! of the attributes a product held before one of its updates, tagged with
//! the interval during which that snapshot is considered valid.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ids::{HistoryId, ProductId};

// ---------------------------------------------------------------------------
// Live state
// ---------------------------------------------------------------------------

/// The mutable attributes of a product, as supplied by a caller on create
/// and update.
///
/// Validated before it reaches any store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ProductAttributes {
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Free-form description (may be empty).
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    /// Price in minor currency units.
    #[validate(range(min = 0))]
    pub price: i64,
}

impl ProductAttributes {
    /// Build an attribute set.
    pub fn new(name: impl Into<String>, description: impl Into<String>, price: i64) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price,
        }
    }
}

/// The current, live state of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable surrogate key.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Price in minor currency units.
    pub price: i64,
    /// When the product was created. Never changes.
    pub created_at: DateTime<Utc>,
    /// When the product was last written. Never moves backwards.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The mutable attributes currently held by this product.
    pub fn attributes(&self) -> ProductAttributes {
        ProductAttributes {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
        }
    }
}

// ---------------------------------------------------------------------------
// History ledger
// ---------------------------------------------------------------------------

/// An immutable snapshot of a product's attributes taken just before an
/// update overwrote them.
///
/// Both interval bounds are inclusive: the record is considered the
/// historical state at every instant `t` with `valid_from <= t <= valid_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Ledger row key, assigned in append order.
    pub history_id: HistoryId,
    /// The product this snapshot belongs to. The product may since have
    /// been deleted.
    pub product_id: ProductId,
    /// Name before the update.
    pub name: String,
    /// Description before the update.
    pub description: String,
    /// Price before the update.
    pub price: i64,
    /// Inclusive lower bound of the validity interval.
    pub valid_from: DateTime<Utc>,
    /// Inclusive upper bound of the validity interval.
    pub valid_to: DateTime<Utc>,
    /// When the ledger row was written.
    pub recorded_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Length of the validity interval.
    pub fn duration(&self) -> TimeDelta {
        self.valid_to.signed_duration_since(self.valid_from)
    }

    /// Whether `instant` falls inside `[valid_from, valid_to]`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.valid_from <= instant && instant <= self.valid_to
    }

    /// The snapshot's attributes, detached from ledger metadata.
    pub fn attributes(&self) -> ProductAttributes {
        ProductAttributes {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
        }
    }

    /// Project this record onto its price interval.
    pub const fn interval(&self) -> ValidityInterval {
        ValidityInterval {
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            price: self.price,
        }
    }
}

/// One entry in a product's price timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityInterval {
    /// Inclusive lower bound.
    pub valid_from: DateTime<Utc>,
    /// Inclusive upper bound.
    pub valid_to: DateTime<Utc>,
    /// Price held during the interval.
    pub price: i64,
}

/// The price of the longest-held historical snapshot and how long it was
/// held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDuration {
    /// Price in minor currency units.
    pub price: i64,
    /// Length of the validity interval in whole seconds.
    pub duration_secs: i64,
}

impl PriceDuration {
    /// The duration as a [`TimeDelta`].
    pub fn duration(&self) -> TimeDelta {
        TimeDelta::seconds(self.duration_secs)
    }
}

/// A live product together with its full ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductHistory {
    /// Current state.
    pub product: Product,
    /// Past states, ordered by `valid_from` ascending.
    pub history: Vec<HistoryRecord>,
}
