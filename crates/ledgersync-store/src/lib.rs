//! The storage boundary the sync engine talks to: row get/put/delete by `(entity_type, entity_id)`, a
//! unique-insert ledger, and a cursor-ordered range scan by
//! `(wallet_id, server_modified)`.
//!
//! `MemoryStorage` is the reference backend used by tests and the testkit
//! crate; a production deployment swaps in a durable implementation of
//! [`Storage`] without touching the engine.

pub mod errors;
pub mod memory;

pub use errors::StorageError;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgersync_core::{Cursor, Entity, EntityType, LedgerKey, PushItemResult, RowKey, WalletId};
use serde::{Deserialize, Serialize};

/// The stored result of a previously-accepted push item. Kept separately from the wire `PushItemResult` so
/// storage can attach ambient bookkeeping (`recorded_at`) without that
/// leaking onto the wire (SPEC_FULL §10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// The exact result returned on first acceptance.
    pub result: PushItemResult,
    /// When this ledger row was written; observability only, never
    /// serialized onto the wire response.
    pub recorded_at: DateTime<Utc>,
}

impl LedgerRecord {
    /// Wrap a result with the current time.
    pub fn new(result: PushItemResult, recorded_at: DateTime<Utc>) -> Self {
        Self { result, recorded_at }
    }
}

/// Row storage plus the operation ledger, as one collaborator interface.
///
/// Row mutations use optimistic concurrency: implementations need
/// no long-held locks, just atomicity around a single `(read version, write
/// new version)` pair, which `put_row` provides as a whole-row replace.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a row by its identity, or `None` if absent.
    async fn get_row(&self, key: &RowKey) -> Result<Option<Entity>, StorageError>;

    /// Insert or replace a row atomically and in full (no partial writes —
    /// readers never see a torn write).
    async fn put_row(&self, entity: Entity) -> Result<(), StorageError>;

    /// Remove a row entirely (hard delete, for types without soft-delete
    /// semantics).
    async fn delete_row(&self, key: &RowKey) -> Result<(), StorageError>;

    /// Rows in `wallet` with `server_modified` strictly greater than
    /// `cursor`, ascending by `(server_modified, entity_id)`, capped at
    /// `limit`.
    async fn scan_since(
        &self,
        wallet: &WalletId,
        cursor: Cursor,
        limit: usize,
    ) -> Result<Vec<Entity>, StorageError>;

    /// All non-hard-deleted rows of `entity_type` in `wallet`, unordered.
    ///
    /// Not part of the sync wire protocol — the recalc dispatcher's
    /// recalculators use this for full, idempotent recomputation"), since their
    /// inputs (every transaction touching an account, every installment on
    /// a debt) can exceed the pull page cap.
    async fn scan_by_type(&self, wallet: &WalletId, entity_type: &EntityType) -> Result<Vec<Entity>, StorageError>;

    /// Look up a previously-recorded ledger result.
    async fn ledger_lookup(&self, key: &LedgerKey) -> Result<Option<LedgerRecord>, StorageError>;

    /// Atomically insert `record` under `key` if absent. On collision,
    /// returns the record that was already stored, discarding `record`
    ///.
    async fn ledger_insert(
        &self,
        key: LedgerKey,
        record: LedgerRecord,
    ) -> Result<LedgerRecord, StorageError>;
}
