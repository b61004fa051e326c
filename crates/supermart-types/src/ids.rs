//! Type-safe identifier wrappers.
//!
//! Row identifiers (items, customers, transactions, ...) are positive
//! integers assigned by the store on insert, mirroring an auto-increment
//! primary key. A value of zero or below is never a valid row ID and is
//! rejected at the controller boundary.
//!
//! Game sessions use UUID v7 (time-ordered) so that sessions created by
//! different engine runs against the same database never collide.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around an `i64` row identifier.
macro_rules! define_row_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw row identifier.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the raw `i64` value.
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Whether this identifier could refer to a stored row (strictly positive).
            pub const fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_row_id! {
    /// Identifier of a stocked item on the shop floor.
    ItemId
}

define_row_id! {
    /// Identifier of a customer created by a purchase.
    CustomerId
}

define_row_id! {
    /// Identifier of an append-only purchase transaction.
    TransactionId
}

define_row_id! {
    /// Identifier of a resolved decision in the decision log.
    DecisionLogId
}

define_row_id! {
    /// Identifier of a supplier (restock) order.
    SupplierOrderId
}

define_row_id! {
    /// Identifier of a player profile.
    PlayerId
}

/// Unique identifier for one played game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Identifier of one presentation of a decision to the player.
///
/// Assigned sequentially by the decision desk; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresentationId(pub u64);

impl core::fmt::Display for PresentationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_id_validity() {
        assert!(ItemId::new(1).is_valid());
        assert!(!ItemId::new(0).is_valid());
        assert!(!CustomerId::new(-4).is_valid());
    }

    #[test]
    fn row_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&ItemId::new(7)).ok();
        assert_eq!(json.as_deref(), Some("7"));
        let restored: Result<ItemId, _> = serde_json::from_str("7");
        assert_eq!(restored.ok(), Some(ItemId::new(7)));
    }

    #[test]
    fn session_ids_are_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn session_id_display_matches_uuid() {
        let id = SessionId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
