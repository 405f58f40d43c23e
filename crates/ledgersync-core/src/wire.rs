//! Wire shapes for the push/pull endpoints.

use crate::entity::Payload;
use crate::errors::ItemErrorCode;
use crate::identifiers::{EntityId, EntityType};
use serde::{Deserialize, Serialize};

/// A single push-batch input item.
///
/// Every field is loosely typed (`String`/`Value` with `#[serde(default)]`)
/// rather than strictly typed, deliberately: a malformed field in item `i`
/// must produce a per-item `error` result, never a JSON deserialization
/// failure that would reject the whole batch and violate item-level
/// isolation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushItem {
    /// Client-assigned idempotency key, unique per `(user, device)`.
    #[serde(default)]
    pub op_id: String,
    /// Entity type discriminator.
    #[serde(default)]
    pub entity_type: String,
    /// Stable client-assigned identity.
    #[serde(default)]
    pub entity_id: String,
    /// Which mutation to apply, as the client sent it — kept as a raw
    /// string (not the typed `OperationKind`) so an unrecognized value
    /// becomes a per-item `invalid_operation` error rather than rejecting
    /// deserialization of the whole batch.
    #[serde(default)]
    pub operation: String,
    /// The type-specific attribute bag, pre-normalization.
    #[serde(default = "default_payload")]
    pub payload: serde_json::Value,
    /// The `doc_version` the client believes the row has, as sent —
    /// `Value` rather than `u64` so a missing or malformed `base_version`
    /// (a string, a float, absent entirely) is a per-item
    /// `base_version_required`/`base_version_invalid` error rather than a
    /// batch-wide deserialization failure.
    #[serde(default)]
    pub base_version: serde_json::Value,
}

fn default_payload() -> serde_json::Value {
    serde_json::Value::Null
}

impl PushItem {
    /// Parse `base_version` for a `create` item: absent/null means 0;
    /// present means it must equal 0.
    pub fn base_version_for_create(&self) -> Option<u64> {
        match &self.base_version {
            serde_json::Value::Null => Some(0),
            v => v.as_u64().filter(|&n| n == 0),
        }
    }

    /// Parse `base_version` for `update`/`delete`: required, must be a
    /// non-negative integer.
    pub fn base_version_required(&self) -> Result<u64, BaseVersionError> {
        match &self.base_version {
            serde_json::Value::Null => Err(BaseVersionError::Required),
            v => v.as_u64().ok_or(BaseVersionError::Invalid),
        }
    }
}

/// Why `base_version` failed to parse for an update/delete item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseVersionError {
    /// The field was absent.
    Required,
    /// The field was present but not a non-negative integer.
    Invalid,
}

/// The kind of mutation a push item requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Insert a new row.
    Create,
    /// Mutate an existing row under optimistic concurrency.
    Update,
    /// Soft- or hard-delete an existing row under optimistic concurrency.
    Delete,
}

impl OperationKind {
    /// Parse the client's raw `operation` string.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// The outcome of applying one push item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PushItemResult {
    /// The mutation was applied for the first time.
    Accepted {
        /// Entity type of the affected row.
        entity_type: EntityType,
        /// Client id of the affected row.
        client_id: EntityId,
        /// The row's version after this mutation.
        doc_version: u64,
        /// When the server assigned this mutation.
        server_modified: chrono::DateTime<chrono::Utc>,
    },
    /// Replay of an already-applied `create`; no new row state was created.
    Duplicate {
        /// Entity type of the affected row.
        entity_type: EntityType,
        /// Client id of the affected row.
        client_id: EntityId,
        /// The row's existing version.
        doc_version: u64,
        /// The row's existing `server_modified`.
        server_modified: chrono::DateTime<chrono::Utc>,
    },
    /// `base_version` did not match the server's current version; nothing
    /// was mutated.
    Conflict {
        /// Entity type of the affected row.
        entity_type: EntityType,
        /// Client id of the affected row.
        client_id: EntityId,
        /// Server's current version (duplicated into `server_record` too).
        doc_version: u64,
        /// Server's current `server_modified`.
        server_modified: chrono::DateTime<chrono::Utc>,
        /// What the client sent as `base_version`.
        client_base_version: u64,
        /// Redundant alias for `doc_version`, kept for client compatibility.
        server_doc_version: u64,
        /// The authoritative server snapshot, unmutated by this push.
        server_record: Payload,
    },
    /// The item failed validation or application.
    Error {
        /// Entity type as supplied by the client (best-effort echo).
        entity_type: Option<EntityType>,
        /// Client id as supplied by the client (best-effort echo).
        client_id: Option<EntityId>,
        /// Stable error code.
        error_code: ItemErrorCode,
        /// Human-readable detail.
        error_message: String,
    },
}

/// The full push response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse {
    /// One result per input item, in the same order.
    pub results: Vec<PushItemResult>,
    /// Server time at which the batch was processed.
    pub server_time: chrono::DateTime<chrono::Utc>,
}

/// One item in a pull response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullItem {
    /// Entity type of the row.
    pub entity_type: EntityType,
    /// Entity id of the row.
    pub entity_id: EntityId,
    /// Redundant alias for `entity_id`, kept for client compatibility.
    pub client_id: EntityId,
    /// The row's current version.
    pub doc_version: u64,
    /// The row's `server_modified`, also this item's position in the cursor
    /// ordering.
    pub server_modified: chrono::DateTime<chrono::Utc>,
    /// The row's attribute bag.
    pub payload: Payload,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// Soft-delete timestamp, if any.
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The full pull response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullResponse {
    /// Items with `server_modified` strictly greater than the request
    /// cursor, ascending, capped at the configured page size.
    pub items: Vec<PullItem>,
    /// Continuation cursor: `server_modified` of the last returned item, or
    /// the request cursor unchanged if `items` is empty.
    pub next_cursor: String,
    /// Whether more items remain beyond this page.
    pub has_more: bool,
    /// Server time at which the pull was processed.
    pub server_time: chrono::DateTime<chrono::Utc>,
}
