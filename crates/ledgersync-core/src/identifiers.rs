//! Identifier newtypes used across the sync engine.
//!
//! All identifiers that cross the wire (`wallet_id`, `device_id`,
//! `entity_id`, `op_id`) are client- or operator-assigned strings, not
//! server-minted UUIDs, so they wrap `String` rather than `Uuid`. `UserId`
//! is the one identity resolved server-side from a bearer token.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Build from any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(UserId, "user");
string_id!(DeviceId, "device");
string_id!(WalletId, "wallet");
string_id!(EntityId, "entity");
string_id!(OpId, "op");

/// Discriminator for a syncable entity type, e.g. `"Account"`, `"Transaction"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(pub String);

impl EntityType {
    /// Build from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityType {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Compound key scoping the operation ledger: replays are deduplicated per
/// `(user, device, op_id)`, Invariants and §4.2.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    /// Resolved user identity.
    pub user: UserId,
    /// Device the operation originated from.
    pub device: DeviceId,
    /// Client-assigned idempotency key.
    pub op_id: OpId,
}

impl LedgerKey {
    /// Build a new ledger key.
    pub fn new(user: UserId, device: DeviceId, op_id: OpId) -> Self {
        Self { user, device, op_id }
    }
}

/// Storage key identifying a single row: `(entity_type, entity_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowKey {
    /// Entity type discriminator.
    pub entity_type: EntityType,
    /// Stable client-assigned identity.
    pub entity_id: EntityId,
}

impl RowKey {
    /// Build a new row key.
    pub fn new(entity_type: EntityType, entity_id: EntityId) -> Self {
        Self { entity_type, entity_id }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}
