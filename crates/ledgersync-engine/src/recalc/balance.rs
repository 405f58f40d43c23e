//! Account balance recalculator: sum of non-deleted
//! transactions touching the account, respecting transfer dual-leg
//! semantics (source decreases, destination increases).

use ledgersync_core::{Clock, Entity, EntityId, EntityType, RowKey, WalletId};
use ledgersync_store::{Storage, StorageError};

/// Recompute and persist `Account.current_balance` for `account_id`, fully
/// from the wallet's current transaction set (no incremental delta).
pub async fn recompute_account_balance(
    storage: &dyn Storage,
    clock: &dyn Clock,
    wallet: &WalletId,
    account_id: &EntityId,
) -> Result<(), StorageError> {
    let key = RowKey::new(EntityType::new("Account"), account_id.clone());
    let Some(account) = storage.get_row(&key).await? else {
        return Ok(());
    };

    let transactions = storage.scan_by_type(wallet, &EntityType::new("Transaction")).await?;
    let mut balance = 0f64;
    for txn in &transactions {
        let Some(amount) = txn.payload.get("amount").and_then(|v| v.as_f64()) else {
            continue;
        };
        let txn_type = txn.payload.get("transaction_type").and_then(|v| v.as_str()).unwrap_or("");
        let txn_account = txn.payload.get("account_id").and_then(|v| v.as_str());
        let txn_to_account = txn.payload.get("to_account_id").and_then(|v| v.as_str());

        match txn_type {
            "income" if txn_account == Some(account_id.as_str()) => balance += amount,
            "expense" if txn_account == Some(account_id.as_str()) => balance -= amount,
            "transfer" => {
                if txn_account == Some(account_id.as_str()) {
                    balance -= amount;
                }
                if txn_to_account == Some(account_id.as_str()) {
                    balance += amount;
                }
            }
            _ => {}
        }
    }

    write_back(storage, clock, wallet, account, balance).await
}

async fn write_back(
    storage: &dyn Storage,
    clock: &dyn Clock,
    wallet: &WalletId,
    account: Entity,
    balance: f64,
) -> Result<(), StorageError> {
    let mut payload = account.payload.clone();
    payload.insert("current_balance".into(), serde_json::json!(balance));
    let updated = Entity {
        doc_version: account.doc_version + 1,
        server_modified: clock.now(wallet).await,
        payload,
        ..account
    };
    storage.put_row(updated).await
}
