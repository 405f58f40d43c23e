//! An in-memory [`Storage`] backend: the reference implementation used by
//! tests, proptests, and the testkit crate. Not durable across process
//! restarts — that tradeoff is deliberate, not a placeholder for something
//! unfinished.

use crate::{LedgerRecord, Storage, StorageError};
use async_trait::async_trait;
use ledgersync_core::{Cursor, Entity, EntityType, LedgerKey, RowKey, WalletId};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct State {
    rows: HashMap<RowKey, Entity>,
    ledger: HashMap<LedgerKey, LedgerRecord>,
}

/// A `Mutex`-guarded in-memory store.
///
/// Row mutations replace the whole `Entity` value under the lock, so a
/// concurrent reader always observes either the old or the new version,
/// never a partial write.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_row(&self, key: &RowKey) -> Result<Option<Entity>, StorageError> {
        Ok(self.state.lock().rows.get(key).cloned())
    }

    async fn put_row(&self, entity: Entity) -> Result<(), StorageError> {
        let key = RowKey::new(entity.entity_type.clone(), entity.entity_id.clone());
        self.state.lock().rows.insert(key, entity);
        Ok(())
    }

    async fn delete_row(&self, key: &RowKey) -> Result<(), StorageError> {
        self.state.lock().rows.remove(key);
        Ok(())
    }

    async fn scan_since(
        &self,
        wallet: &WalletId,
        cursor: Cursor,
        limit: usize,
    ) -> Result<Vec<Entity>, StorageError> {
        let state = self.state.lock();
        let mut matches: Vec<Entity> = state
            .rows
            .values()
            .filter(|row| &row.wallet_id == wallet && row.server_modified > cursor.into_datetime())
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.server_modified
                .cmp(&b.server_modified)
                .then_with(|| a.entity_id.0.cmp(&b.entity_id.0))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn scan_by_type(&self, wallet: &WalletId, entity_type: &EntityType) -> Result<Vec<Entity>, StorageError> {
        let state = self.state.lock();
        Ok(state
            .rows
            .values()
            .filter(|row| &row.wallet_id == wallet && &row.entity_type == entity_type && !row.is_deleted)
            .cloned()
            .collect())
    }

    async fn ledger_lookup(&self, key: &LedgerKey) -> Result<Option<LedgerRecord>, StorageError> {
        Ok(self.state.lock().ledger.get(key).cloned())
    }

    async fn ledger_insert(
        &self,
        key: LedgerKey,
        record: LedgerRecord,
    ) -> Result<LedgerRecord, StorageError> {
        let mut state = self.state.lock();
        if let Some(existing) = state.ledger.get(&key) {
            return Ok(existing.clone());
        }
        state.ledger.insert(key, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_core::{DeviceId, EntityId, EntityType, PushItemResult, UserId};

    fn entity(wallet: &str, id: &str, server_modified: chrono::DateTime<chrono::Utc>) -> Entity {
        Entity {
            entity_type: EntityType::new("Account"),
            entity_id: EntityId::new(id),
            wallet_id: WalletId::new(wallet),
            doc_version: 1,
            server_modified,
            client_created_ms: 0,
            client_modified_ms: 0,
            is_deleted: false,
            deleted_at: None,
            payload: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn get_put_roundtrip() {
        let store = MemoryStorage::new();
        let e = entity("w1", "acc-1", chrono::Utc::now());
        let key = RowKey::new(e.entity_type.clone(), e.entity_id.clone());
        store.put_row(e.clone()).await.unwrap();
        let fetched = store.get_row(&key).await.unwrap().unwrap();
        assert_eq!(fetched.entity_id, e.entity_id);
    }

    #[tokio::test]
    async fn scan_since_orders_by_time_then_id_and_respects_wallet() {
        let store = MemoryStorage::new();
        let base = chrono::Utc::now();
        store.put_row(entity("w1", "acc-b", base + chrono::Duration::seconds(2))).await.unwrap();
        store.put_row(entity("w1", "acc-a", base + chrono::Duration::seconds(1))).await.unwrap();
        store.put_row(entity("w2", "acc-x", base + chrono::Duration::seconds(1))).await.unwrap();

        let results = store
            .scan_since(&WalletId::new("w1"), Cursor::epoch(), 10)
            .await
            .unwrap();
        let ids: Vec<_> = results.iter().map(|e| e.entity_id.0.clone()).collect();
        assert_eq!(ids, vec!["acc-a", "acc-b"]);
    }

    #[tokio::test]
    async fn scan_by_type_excludes_other_wallets_and_soft_deleted() {
        let store = MemoryStorage::new();
        let now = chrono::Utc::now();
        store.put_row(entity("w1", "acc-1", now)).await.unwrap();
        store.put_row(entity("w2", "acc-2", now)).await.unwrap();
        let mut deleted = entity("w1", "acc-3", now);
        deleted.is_deleted = true;
        store.put_row(deleted).await.unwrap();

        let rows = store
            .scan_by_type(&WalletId::new("w1"), &EntityType::new("Account"))
            .await
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|e| e.entity_id.0.clone()).collect();
        assert_eq!(ids, vec!["acc-1"]);
    }

    #[tokio::test]
    async fn ledger_insert_is_idempotent_on_collision() {
        let store = MemoryStorage::new();
        let key = LedgerKey::new(UserId::new("u1"), DeviceId::new("d1"), "op-1".to_string().into());
        let first = LedgerRecord::new(
            PushItemResult::Accepted {
                entity_type: EntityType::new("Account"),
                client_id: EntityId::new("acc-1"),
                doc_version: 1,
                server_modified: chrono::Utc::now(),
            },
            chrono::Utc::now(),
        );
        let second = LedgerRecord::new(
            PushItemResult::Accepted {
                entity_type: EntityType::new("Account"),
                client_id: EntityId::new("acc-1"),
                doc_version: 99,
                server_modified: chrono::Utc::now(),
            },
            chrono::Utc::now(),
        );

        let stored_first = store.ledger_insert(key.clone(), first).await.unwrap();
        let stored_second = store.ledger_insert(key.clone(), second).await.unwrap();

        match (stored_first.result, stored_second.result) {
            (PushItemResult::Accepted { doc_version: v1, .. }, PushItemResult::Accepted { doc_version: v2, .. }) => {
                assert_eq!(v1, 1);
                assert_eq!(v2, 1, "second insert must return the first record, not overwrite");
            }
            _ => panic!("unexpected result variant"),
        }
    }
}
