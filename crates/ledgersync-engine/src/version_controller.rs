//! Version Controller: applies create/update/delete under
//! optimistic `base_version` concurrency, per the row state machine
//! `{absent, live, soft_deleted, hard_gone}`.
//!
//! This module never consults the operation ledger — by the time `apply`
//! runs, the caller (the push orchestrator) has already confirmed this
//! `op_id` has no recorded result. What this module resolves instead is
//! the row-identity collision case: a *new* `op_id` attempting `create`
//! against an `entity_id` that already has a live row, which the ledger
//! alone cannot catch.

use chrono::{DateTime, Utc};
use ledgersync_core::entity::Payload;
use ledgersync_core::registry::EntityDescriptor;
use ledgersync_core::{Entity, EntityId, EntityType, OperationKind, PushItemResult, WalletId};
use ledgersync_store::{Storage, StorageError};

/// Apply one normalized mutation against the current row state.
///
/// `merge_payload` is the canonical payload produced by the normalizer: on
/// `create` it becomes the row's whole payload; on `update` its keys are
/// merged over the existing payload (a partial update, not a full
/// replace — the normalizer only emits keys the client actually sent).
/// `client_created_ms`/`client_modified_ms` are the normalizer's already
/// int32-clamped values, used to seed a newly-created row.
#[allow(clippy::too_many_arguments)]
pub async fn apply(
    storage: &dyn Storage,
    descriptor: &EntityDescriptor,
    wallet: &WalletId,
    entity_type: &EntityType,
    entity_id: &EntityId,
    operation: OperationKind,
    merge_payload: Payload,
    client_created_ms: i64,
    client_modified_ms: i64,
    base_version: u64,
    now: DateTime<Utc>,
) -> Result<VersionOutcome, StorageError> {
    let key = ledgersync_core::RowKey::new(entity_type.clone(), entity_id.clone());
    let existing = storage.get_row(&key).await?;

    let outcome = match (existing, operation) {
        (None, OperationKind::Create) => {
            let entity = Entity {
                entity_type: entity_type.clone(),
                entity_id: entity_id.clone(),
                wallet_id: wallet.clone(),
                doc_version: 1,
                server_modified: now,
                client_created_ms,
                client_modified_ms,
                is_deleted: false,
                deleted_at: None,
                payload: merge_payload,
            };
            storage.put_row(entity.clone()).await?;
            VersionOutcome::Accepted(entity)
        }

        (Some(existing), OperationKind::Create) if !existing.is_deleted => {
            // Row already live under this entity_id. No mutation; the caller
            // reports this as a duplicate, not a conflict.
            VersionOutcome::Duplicate(existing)
        }

        (Some(existing), OperationKind::Create) => {
            // Row exists but is soft-deleted: creation is terminal once a
            // row has been deleted (deletion-is-terminal resolution below).
            let _ = existing;
            VersionOutcome::NotFound
        }

        (None, OperationKind::Update | OperationKind::Delete) => VersionOutcome::NotFound,

        (Some(existing), OperationKind::Update) if existing.is_deleted => {
            // soft_deleted + update: deletion is terminal, so this is
            // reported as not_found rather than reviving the row.
            let _ = existing;
            VersionOutcome::NotFound
        }

        (Some(existing), OperationKind::Update) => {
            if base_version != existing.doc_version {
                VersionOutcome::Conflict(existing)
            } else {
                let mut payload = existing.payload.clone();
                for (k, v) in merge_payload {
                    payload.insert(k, v);
                }
                let updated = Entity {
                    doc_version: existing.doc_version + 1,
                    server_modified: now,
                    payload,
                    ..existing
                };
                storage.put_row(updated.clone()).await?;
                VersionOutcome::Accepted(updated)
            }
        }

        (Some(existing), OperationKind::Delete) if existing.is_deleted => {
            // soft_deleted + delete: idempotent no-op on a matching
            // base_version, conflict otherwise (neither bumps doc_version;
            // this resolves "replay semantics per ledger"
            // clause for the case where the ledger itself was bypassed,
            // e.g. a second distinct op_id targeting an already-deleted
            // row).
            if base_version == existing.doc_version {
                VersionOutcome::Duplicate(existing)
            } else {
                VersionOutcome::Conflict(existing)
            }
        }

        (Some(existing), OperationKind::Delete) => {
            if base_version != existing.doc_version {
                VersionOutcome::Conflict(existing)
            } else if descriptor.soft_delete {
                let deleted = Entity {
                    doc_version: existing.doc_version + 1,
                    server_modified: now,
                    is_deleted: true,
                    deleted_at: Some(now),
                    ..existing
                };
                storage.put_row(deleted.clone()).await?;
                VersionOutcome::Accepted(deleted)
            } else {
                storage.delete_row(&key).await?;
                VersionOutcome::HardDeleted(existing)
            }
        }
    };

    Ok(outcome)
}

/// What happened to a row after one `apply` call.
pub enum VersionOutcome {
    /// The mutation was applied; `Entity` reflects the new state.
    Accepted(Entity),
    /// A `create` replay-by-identity or an idempotent re-delete; `Entity`
    /// is the unchanged existing row.
    Duplicate(Entity),
    /// `base_version` mismatched; `Entity` is the unchanged current row.
    Conflict(Entity),
    /// Row had no deletion semantics and was hard-removed; `Entity` is the
    /// pre-delete snapshot (its `doc_version` is what callers should
    /// report,).
    HardDeleted(Entity),
    /// No row exists and the operation was not `create`, or the row is
    /// soft-deleted and the operation is terminal against it.
    NotFound,
}

impl VersionOutcome {
    /// Project this outcome to the wire result shape (entity_type/client_id
    /// supplied by the caller since `NotFound` carries no `Entity`;
    /// `client_base_version` likewise, since only the caller knows what the
    /// client actually sent).
    pub fn into_push_result(
        self,
        entity_type: EntityType,
        client_id: EntityId,
        client_base_version: u64,
    ) -> PushItemResult {
        match self {
            Self::Accepted(e) => PushItemResult::Accepted {
                entity_type,
                client_id,
                doc_version: e.doc_version,
                server_modified: e.server_modified,
            },
            Self::Duplicate(e) => PushItemResult::Duplicate {
                entity_type,
                client_id,
                doc_version: e.doc_version,
                server_modified: e.server_modified,
            },
            Self::Conflict(e) => PushItemResult::Conflict {
                entity_type,
                client_id,
                doc_version: e.doc_version,
                server_modified: e.server_modified,
                client_base_version,
                server_doc_version: e.doc_version,
                server_record: e.to_pull_item(),
            },
            Self::HardDeleted(e) => PushItemResult::Accepted {
                entity_type,
                client_id,
                doc_version: e.doc_version,
                server_modified: e.server_modified,
            },
            Self::NotFound => PushItemResult::Error {
                entity_type: Some(entity_type),
                client_id: Some(client_id),
                error_code: ledgersync_core::ItemErrorCode::NotFound,
                error_message: ledgersync_core::ItemErrorCode::NotFound.message().to_string(),
            },
        }
    }
}
