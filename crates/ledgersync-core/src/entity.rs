//! The entity row shape shared by every syncable type.

use crate::identifiers::{EntityId, EntityType, WalletId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The type-specific attribute bag. Always contains `client_id == entity_id`
/// once normalized.
pub type Payload = Map<String, Value>;

/// A fully-materialized syncable row, as stored and as returned from pulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Discriminator from the Entity Registry.
    pub entity_type: EntityType,
    /// Stable identity assigned by the client at creation.
    pub entity_id: EntityId,
    /// The single wallet that owns this row; immutable after creation.
    pub wallet_id: WalletId,
    /// Monotonic per-row version; starts at 1, +1 per accepted mutation.
    pub doc_version: u64,
    /// Strictly-monotonic server assignment time; doubles as pull cursor key.
    pub server_modified: chrono::DateTime<chrono::Utc>,
    /// Client-supplied creation time, int32-clamped on ingest.
    pub client_created_ms: i64,
    /// Client-supplied last-modified time, int32-clamped on ingest.
    pub client_modified_ms: i64,
    /// Soft-delete marker; `false` for entity types without delete semantics.
    pub is_deleted: bool,
    /// Soft-delete timestamp, set iff `is_deleted`.
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    /// The type-specific attribute bag (always includes `client_id`).
    pub payload: Payload,
}

impl Entity {
    /// Project this row to the pull item shape.
    pub fn to_pull_item(&self) -> Payload {
        let mut item = Map::new();
        item.insert("entity_type".into(), Value::String(self.entity_type.0.clone()));
        item.insert("entity_id".into(), Value::String(self.entity_id.0.clone()));
        item.insert("client_id".into(), Value::String(self.entity_id.0.clone()));
        item.insert("doc_version".into(), Value::from(self.doc_version));
        item.insert(
            "server_modified".into(),
            Value::String(self.server_modified.to_rfc3339()),
        );
        item.insert("payload".into(), Value::Object(self.payload.clone()));
        item.insert("is_deleted".into(), Value::Bool(self.is_deleted));
        item.insert(
            "deleted_at".into(),
            self.deleted_at
                .map(|ts| Value::String(ts.to_rfc3339()))
                .unwrap_or(Value::Null),
        );
        item
    }
}

/// Clamp a client-supplied epoch-millis value to the int32 range, protecting storage columns sized for 32-bit timestamps.
pub fn clamp_i32_ms(value: i64) -> i64 {
    value.clamp(i32::MIN as i64, i32::MAX as i64)
}
