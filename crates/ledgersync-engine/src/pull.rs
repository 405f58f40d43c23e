//! Pull Orchestrator & Delta Producer:
//! `pull(scope, cursor|since, limit)`.

use ledgersync_core::{Clock, Cursor, EngineConfig, Error, PullItem, PullResponse, Result, Scope};
use ledgersync_store::Storage;
use std::str::FromStr;

/// Run one pull request to completion.
///
/// `raw_cursor` accepts ISO-8601, epoch-compatible numerics, or the opaque
/// `next_cursor` from a prior response; absent means
/// "from the beginning" (`Cursor::epoch()`).
pub async fn pull(
    storage: &dyn Storage,
    clock: &dyn Clock,
    config: &EngineConfig,
    scope: &Scope,
    raw_cursor: Option<&str>,
    limit: usize,
) -> Result<PullResponse> {
    let cursor = match raw_cursor {
        None => Cursor::epoch(),
        Some(raw) => Cursor::from_str(raw).map_err(Error::invalid_cursor)?,
    };
    let page_size = limit.clamp(1, config.max_pull_page);

    tracing::info!(wallet_id = %scope.wallet, device_id = %scope.device, %cursor, page_size, "pull requested");

    // Fetch one extra row to determine `has_more` without a second count
    // query.
    let mut rows = storage
        .scan_since(&scope.wallet, cursor, page_size + 1)
        .await
        .map_err(|e| Error::storage(e.to_string()))?;

    let has_more = rows.len() > page_size;
    rows.truncate(page_size);

    let next_cursor = rows
        .last()
        .map(|row| Cursor::from_datetime(row.server_modified).to_string())
        .unwrap_or_else(|| cursor.to_string());

    let items: Vec<PullItem> = rows
        .into_iter()
        .map(|row| PullItem {
            entity_type: row.entity_type,
            entity_id: row.entity_id.clone(),
            client_id: row.entity_id,
            doc_version: row.doc_version,
            server_modified: row.server_modified,
            payload: row.payload,
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at,
        })
        .collect();

    tracing::debug!(item_count = items.len(), has_more, "pull page produced");

    Ok(PullResponse {
        items,
        next_cursor,
        has_more,
        server_time: clock.now(&scope.wallet).await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_core::{Entity, EntityId, EntityType, WalletId};
    use ledgersync_store::MemoryStorage;
    use ledgersync_testkit::{owner_scope, FixedClock};

    fn account(wallet: &str, id: &str, server_modified: chrono::DateTime<chrono::Utc>) -> Entity {
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
    async fn paginates_with_strictly_increasing_cursors_and_no_overlap() {
        let storage = MemoryStorage::new();
        let base = chrono::Utc::now();
        for (i, name) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            storage
                .put_row(account("w1", &format!("acc-{name}"), base + chrono::Duration::milliseconds(i as i64)))
                .await
                .unwrap();
        }
        let clock = FixedClock::starting_at(base);
        let config = EngineConfig::default();
        let scope = owner_scope("u1", "d1", "w1");

        let page1 = pull(&storage, &clock, &config, &scope, None, 2).await.unwrap();
        assert_eq!(page1.items.len(), 2);
        assert!(page1.has_more);

        let page2 = pull(&storage, &clock, &config, &scope, Some(&page1.next_cursor), 2).await.unwrap();
        assert_eq!(page2.items.len(), 2);
        assert!(page2.has_more);

        let page3 = pull(&storage, &clock, &config, &scope, Some(&page2.next_cursor), 2).await.unwrap();
        assert_eq!(page3.items.len(), 1);
        assert!(!page3.has_more);

        let page4 = pull(&storage, &clock, &config, &scope, Some(&page3.next_cursor), 2).await.unwrap();
        assert!(page4.items.is_empty());
        assert_eq!(page4.next_cursor, page3.next_cursor);
    }

    #[tokio::test]
    async fn wallet_isolation_is_enforced_by_scan_since() {
        let storage = MemoryStorage::new();
        let base = chrono::Utc::now();
        storage.put_row(account("w1", "acc-1", base)).await.unwrap();
        storage.put_row(account("w2", "acc-2", base)).await.unwrap();
        let clock = FixedClock::starting_at(base);
        let config = EngineConfig::default();
        let scope = owner_scope("u1", "d1", "w1");
        let response = pull(&storage, &clock, &config, &scope, None, 10).await.unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].entity_id, EntityId::new("acc-1"));
    }

    #[tokio::test]
    async fn malformed_cursor_is_rejected() {
        let storage = MemoryStorage::new();
        let clock = FixedClock::starting_at(chrono::Utc::now());
        let config = EngineConfig::default();
        let scope = owner_scope("u1", "d1", "w1");
        let err = pull(&storage, &clock, &config, &scope, Some("not-a-cursor"), 10).await.unwrap_err();
        assert!(matches!(err, Error::InvalidCursor { .. }));
    }
}
