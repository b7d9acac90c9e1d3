//! Identifier newtypes
//!
//! Element and item ids are opaque strings minted by the ingestion layer.
//! Lot ids are minted here as ULIDs so they sort by creation time.

use ilm_cache::CacheScope;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw id
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Stable identifier of a building element
    ElementId
);

string_id!(
    /// Identifier of an item (grouping scope that owns lots)
    ItemId
);

string_id!(
    /// Identifier of an inspection lot
    LotId
);

/// Id of the catch-all item holding elements not yet placed in a lot
pub const UNASSIGNED_ITEM_ID: &str = "unassigned";

impl ItemId {
    /// The distinguished Unassigned Item
    #[inline]
    #[must_use]
    pub fn unassigned() -> Self {
        Self::new(UNASSIGNED_ITEM_ID)
    }

    /// Check if this is the Unassigned Item
    #[inline]
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        self.0 == UNASSIGNED_ITEM_ID
    }

    /// Cache scope covering every aggregate view derived from this item
    #[inline]
    #[must_use]
    pub fn cache_scope(&self) -> CacheScope {
        CacheScope::new("item", &self.0)
    }
}

impl LotId {
    /// Mint a fresh, time-sortable lot id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Cache scope covering every aggregate view derived from this lot
    #[inline]
    #[must_use]
    pub fn cache_scope(&self) -> CacheScope {
        CacheScope::new("lot", &self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_lot_ids_are_unique() {
        let a = LotId::generate();
        let b = LotId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 26);
    }

    #[test]
    fn unassigned_item() {
        assert!(ItemId::unassigned().is_unassigned());
        assert!(!ItemId::new("level-3").is_unassigned());
    }

    #[test]
    fn scopes_are_kind_prefixed() {
        assert_eq!(ItemId::new("i1").cache_scope().prefix(), "item:i1/");
        assert_eq!(LotId::new("l1").cache_scope().prefix(), "lot:l1/");
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ElementId::new("wall-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"wall-1\"");
    }
}
