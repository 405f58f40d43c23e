//! Goal progress recalculator: `save` goals mirror the linked
//! account's current balance; `pay_debt` goals mirror `principal −
//! sum(paid_installments)` via the linked debt's already-recomputed
//! `remaining_amount`.

use ledgersync_core::{Clock, Entity, EntityId, EntityType, RowKey, WalletId};
use ledgersync_store::{Storage, StorageError};

pub async fn recompute_goal_progress(
    storage: &dyn Storage,
    clock: &dyn Clock,
    wallet: &WalletId,
    goal_id: &EntityId,
) -> Result<(), StorageError> {
    let key = RowKey::new(EntityType::new("Goal"), goal_id.clone());
    let Some(goal) = storage.get_row(&key).await? else {
        return Ok(());
    };

    let goal_type = goal.payload.get("goal_type").and_then(|v| v.as_str()).unwrap_or("");
    let progress = match goal_type {
        "save" => {
            let Some(account_id) = goal.payload.get("linked_account_id").and_then(|v| v.as_str()) else {
                return Ok(());
            };
            let account_key = RowKey::new(EntityType::new("Account"), EntityId::new(account_id));
            storage
                .get_row(&account_key)
                .await?
                .and_then(|account| account.payload.get("current_balance").and_then(|v| v.as_f64()))
                .unwrap_or(0.0)
        }
        "pay_debt" => {
            let Some(debt_id) = goal.payload.get("linked_debt_id").and_then(|v| v.as_str()) else {
                return Ok(());
            };
            let debt_key = RowKey::new(EntityType::new("Debt"), EntityId::new(debt_id));
            let debt = storage.get_row(&debt_key).await?;
            let principal = debt.as_ref().and_then(|d| d.payload.get("principal")).and_then(|v| v.as_f64()).unwrap_or(0.0);
            let remaining = debt
                .as_ref()
                .and_then(|d| d.payload.get("remaining_amount"))
                .and_then(|v| v.as_f64())
                .unwrap_or(principal);
            (principal - remaining).max(0.0)
        }
        _ => return Ok(()),
    };

    write_back(storage, clock, wallet, goal, progress).await
}

async fn write_back(
    storage: &dyn Storage,
    clock: &dyn Clock,
    wallet: &WalletId,
    goal: Entity,
    progress: f64,
) -> Result<(), StorageError> {
    let mut payload = goal.payload.clone();
    payload.insert("progress_amount".into(), serde_json::json!(progress));
    let updated = Entity {
        doc_version: goal.doc_version + 1,
        server_modified: clock.now(wallet).await,
        payload,
        ..goal
    };
    storage.put_row(updated).await
}
