//! Bucket allocation recalculator: for income transactions,
//! derive allocation rows from the applicable bucket rule.
//!
//! Rule priority: by-account > by-income-category > global-default;
//! ties within a priority tier broken by `server_modified` desc, then
//! `doc_version` desc. Auto-allocation rows are hard-deleted and
//! recreated on every recompute (idempotent, not incremental); manual
//! allocations are never touched. Rounding remainders are assigned to the
//! highest-percent line.

use ledgersync_core::{Clock, Entity, EntityId, EntityType, RowKey, WalletId};
use ledgersync_store::{Storage, StorageError};

#[derive(Debug, Clone)]
struct AllocationLine {
    category: String,
    percent: f64,
}

pub async fn recompute_bucket_allocations(
    storage: &dyn Storage,
    clock: &dyn Clock,
    wallet: &WalletId,
    transaction_id: &EntityId,
) -> Result<(), StorageError> {
    let txn_key = RowKey::new(EntityType::new("Transaction"), transaction_id.clone());
    let Some(txn) = storage.get_row(&txn_key).await? else {
        return delete_auto_allocations(storage, wallet, transaction_id).await;
    };
    if txn.is_deleted {
        return delete_auto_allocations(storage, wallet, transaction_id).await;
    }
    if txn.payload.get("transaction_type").and_then(|v| v.as_str()) != Some("income") {
        return delete_auto_allocations(storage, wallet, transaction_id).await;
    }
    let Some(amount) = txn.payload.get("amount").and_then(|v| v.as_f64()) else {
        return delete_auto_allocations(storage, wallet, transaction_id).await;
    };

    let rules = storage.scan_by_type(wallet, &EntityType::new("BucketRule")).await?;
    let account_id = txn.payload.get("account_id").and_then(|v| v.as_str());
    let category = txn.payload.get("category").and_then(|v| v.as_str());

    let chosen = select_rule(&rules, account_id, category);

    delete_auto_allocations(storage, wallet, transaction_id).await?;

    let Some(rule) = chosen else {
        return Ok(());
    };
    let Some(lines) = parse_allocation_lines(&rule) else {
        return Ok(());
    };
    if lines.is_empty() {
        return Ok(());
    }

    let rounded = round_with_remainder(amount, &lines);
    for (line, allocated_amount) in lines.iter().zip(rounded) {
        let allocation_id = format!("{}:auto:{}", transaction_id.as_str(), line.category);
        let mut payload = serde_json::Map::new();
        payload.insert("client_id".into(), serde_json::Value::String(allocation_id.clone()));
        payload.insert("transaction_id".into(), serde_json::Value::String(transaction_id.as_str().to_string()));
        payload.insert("bucket_rule_id".into(), serde_json::Value::String(rule.entity_id.as_str().to_string()));
        payload.insert("category".into(), serde_json::Value::String(line.category.clone()));
        payload.insert("amount".into(), serde_json::json!(allocated_amount));
        payload.insert("manual".into(), serde_json::Value::Bool(false));
        let entity = Entity {
            entity_type: EntityType::new("BucketAllocation"),
            entity_id: EntityId::new(allocation_id),
            wallet_id: wallet.clone(),
            doc_version: 1,
            server_modified: clock.now(wallet).await,
            client_created_ms: 0,
            client_modified_ms: 0,
            is_deleted: false,
            deleted_at: None,
            payload,
        };
        storage.put_row(entity).await?;
    }

    Ok(())
}

async fn delete_auto_allocations(
    storage: &dyn Storage,
    wallet: &WalletId,
    transaction_id: &EntityId,
) -> Result<(), StorageError> {
    let existing = storage.scan_by_type(wallet, &EntityType::new("BucketAllocation")).await?;
    for allocation in existing {
        let is_manual = allocation.payload.get("manual").and_then(|v| v.as_bool()).unwrap_or(false);
        let matches_txn = allocation.payload.get("transaction_id").and_then(|v| v.as_str()) == Some(transaction_id.as_str());
        if matches_txn && !is_manual {
            let key = RowKey::new(EntityType::new("BucketAllocation"), allocation.entity_id);
            storage.delete_row(&key).await?;
        }
    }
    Ok(())
}

fn select_rule(rules: &[Entity], account_id: Option<&str>, category: Option<&str>) -> Option<Entity> {
    let by_account: Vec<&Entity> = rules
        .iter()
        .filter(|r| r.payload.get("scope_type").and_then(|v| v.as_str()) == Some("by_account"))
        .filter(|r| account_id.is_some() && r.payload.get("account_id").and_then(|v| v.as_str()) == account_id)
        .collect();
    let by_category: Vec<&Entity> = rules
        .iter()
        .filter(|r| r.payload.get("scope_type").and_then(|v| v.as_str()) == Some("by_income_category"))
        .filter(|r| category.is_some() && r.payload.get("income_category").and_then(|v| v.as_str()) == category)
        .collect();
    let global: Vec<&Entity> = rules
        .iter()
        .filter(|r| r.payload.get("scope_type").and_then(|v| v.as_str()) == Some("global"))
        .collect();

    for tier in [by_account, by_category, global] {
        if let Some(winner) = tiebreak(tier) {
            return Some(winner.clone());
        }
    }
    None
}

fn tiebreak<'a>(candidates: Vec<&'a Entity>) -> Option<&'a Entity> {
    candidates
        .into_iter()
        .max_by(|a, b| {
            a.server_modified
                .cmp(&b.server_modified)
                .then_with(|| a.doc_version.cmp(&b.doc_version))
        })
}

fn parse_allocation_lines(rule: &Entity) -> Option<Vec<AllocationLine>> {
    let raw = rule.payload.get("allocations")?.as_array()?;
    let mut lines = Vec::new();
    for entry in raw {
        let category = entry.get("category")?.as_str()?.to_string();
        let percent = entry.get("percent")?.as_f64()?;
        lines.push(AllocationLine { category, percent });
    }
    Some(lines)
}

/// Round each line to cents, then push the leftover remainder onto the
/// highest-percent line so the total reconciles exactly to `amount`.
fn round_with_remainder(amount: f64, lines: &[AllocationLine]) -> Vec<f64> {
    let mut rounded: Vec<f64> = lines
        .iter()
        .map(|line| ((amount * line.percent / 100.0) * 100.0).round() / 100.0)
        .collect();

    let sum: f64 = rounded.iter().sum();
    let remainder = ((amount - sum) * 100.0).round() / 100.0;

    if remainder.abs() >= 0.005 {
        if let Some((idx, _)) = lines
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.percent.partial_cmp(&b.percent).unwrap_or(std::cmp::Ordering::Equal))
        {
            rounded[idx] = (rounded[idx] * 100.0).round() / 100.0 + remainder;
        }
    }

    rounded
}
