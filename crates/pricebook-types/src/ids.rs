//! Type-safe identifier wrappers around database surrogate keys.
//!
//! Products and history rows are keyed by `BIGSERIAL` columns, so the
//! identifiers are allocated by the store (monotonically, starting at 1)
//! and wrapped here to prevent mixing a product id with a history id.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around an `i64` surrogate key.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Return the inner key value.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl core::str::FromStr for $name {
            type Err = core::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }
    };
}

define_id! {
    /// Identifier of a live product row.
    ProductId
}

define_id! {
    /// Identifier of a history ledger row.
    HistoryId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&ProductId(42)).ok();
        assert_eq!(json.as_deref(), Some("42"));
        let restored: Result<ProductId, _> = serde_json::from_str("42");
        assert_eq!(restored.ok(), Some(ProductId(42)));
    }

    #[test]
    fn id_parses_from_path_segment() {
        assert_eq!("7".parse::<HistoryId>().ok(), Some(HistoryId(7)));
        assert!("seven".parse::<HistoryId>().is_err());
    }

    #[test]
    fn id_display_matches_inner() {
        let id = ProductId(1001);
        assert_eq!(id.to_string(), "1001");
        assert_eq!(i64::from(id), 1001);
    }
}
