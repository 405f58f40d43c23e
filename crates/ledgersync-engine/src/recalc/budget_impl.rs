//! Budget spent recalculator: sum of non-deleted expense
//! transactions matching the budget's scope (total or single category)
//! within `[start_date, end_date]`.

use ledgersync_core::{Clock, Entity, EntityId, EntityType, RowKey, WalletId};
use ledgersync_store::{Storage, StorageError};

pub async fn recompute_budget_spent(
    storage: &dyn Storage,
    clock: &dyn Clock,
    wallet: &WalletId,
    budget_id: &EntityId,
) -> Result<(), StorageError> {
    let key = RowKey::new(EntityType::new("Budget"), budget_id.clone());
    let Some(budget) = storage.get_row(&key).await? else {
        return Ok(());
    };

    let scope_category = budget.payload.get("category").and_then(|v| v.as_str());
    let start = budget
        .payload
        .get("start_date")
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok());
    let end = budget
        .payload
        .get("end_date")
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok());

    let transactions = storage.scan_by_type(wallet, &EntityType::new("Transaction")).await?;
    let mut spent = 0f64;
    for txn in &transactions {
        if txn.payload.get("transaction_type").and_then(|v| v.as_str()) != Some("expense") {
            continue;
        }
        if let Some(scope_category) = scope_category {
            if txn.payload.get("category").and_then(|v| v.as_str()) != Some(scope_category) {
                continue;
            }
        }
        let Some(occurred_at) = txn
            .payload
            .get("occurred_at")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        else {
            continue;
        };
        let in_range = match (start, end) {
            (Some(start), Some(end)) => occurred_at >= start && occurred_at <= end,
            _ => false,
        };
        if !in_range {
            continue;
        }
        if let Some(amount) = txn.payload.get("amount").and_then(|v| v.as_f64()) {
            spent += amount;
        }
    }

    write_back(storage, clock, wallet, budget, spent).await
}

async fn write_back(
    storage: &dyn Storage,
    clock: &dyn Clock,
    wallet: &WalletId,
    budget: Entity,
    spent: f64,
) -> Result<(), StorageError> {
    let mut payload = budget.payload.clone();
    payload.insert("spent_amount".into(), serde_json::json!(spent));
    let updated = Entity {
        doc_version: budget.doc_version + 1,
        server_modified: clock.now(wallet).await,
        payload,
        ..budget
    };
    storage.put_row(updated).await
}
