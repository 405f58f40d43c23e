//! Recalc Dispatcher: after every accepted mutation, the
//! registry's recalc hook returns a set of derived-aggregate tasks. Tasks
//! are deduplicated within the batch so the most expensive aggregate runs
//! at most once per batch per target.
//!
//! Dispatch runs in two layers. The first layer (`AccountBalance`,
//! `DebtRemaining`, `BucketAllocations`, `BudgetSpent`) comes straight from
//! each mutated row's registry hook, plus a direct expansion for
//! `Transaction` mutations against the wallet's `Budget` rows (the hook
//! itself has no wallet-wide visibility to find matching budgets). The
//! second layer (`GoalProgress`) depends on the *already-recomputed*
//! account balance or debt remainder, so it only runs after the first
//! layer has committed its writes.

mod balance;
mod budget_impl;
mod bucket;
mod debt;
mod goal;

use ledgersync_core::entity::Payload;
use ledgersync_core::registry::{AcceptedMutation, RecalcKind, RecalcTask};
use ledgersync_core::{Clock, EntityId, EntityRegistry, EntityType, WalletId};
use ledgersync_store::{Storage, StorageError};
use std::collections::HashSet;

pub use balance::recompute_account_balance;
pub use bucket::recompute_bucket_allocations;
pub use debt::recompute_debt_remaining;
pub use goal::recompute_goal_progress;

/// One accepted mutation, owned, as the dispatcher needs to hold it past
/// the lifetime of the push orchestrator's borrow of the row state.
pub struct MutationRecord {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub old_payload: Option<Payload>,
    pub new_payload: Option<Payload>,
}

/// Run the full recalc dispatch for one push batch's accepted mutations.
pub async fn run(
    storage: &dyn Storage,
    clock: &dyn Clock,
    registry: &EntityRegistry,
    wallet: &WalletId,
    mutations: &[MutationRecord],
) -> Result<(), StorageError> {
    let mut first_layer: HashSet<RecalcTask> = HashSet::new();

    for mutation in mutations {
        if let Some(descriptor) = registry.get(&mutation.entity_type) {
            let accepted = AcceptedMutation {
                wallet_id: wallet,
                entity_type: &mutation.entity_type,
                entity_id: &mutation.entity_id,
                old_payload: mutation.old_payload.as_ref(),
                new_payload: mutation.new_payload.as_ref(),
            };
            first_layer.extend((descriptor.recalc_hook)(&accepted));
        }

        if mutation.entity_type.as_str() == "Transaction" {
            first_layer.extend(budget_tasks_for_transaction(storage, wallet, mutation).await?);
        }
    }

    let mut touched_accounts = HashSet::new();
    let mut touched_debts = HashSet::new();

    for task in &first_layer {
        match task.kind {
            RecalcKind::AccountBalance => {
                recompute_account_balance(storage, clock, wallet, &task.target_id).await?;
                touched_accounts.insert(task.target_id.clone());
            }
            RecalcKind::DebtRemaining => {
                recompute_debt_remaining(storage, clock, wallet, &task.target_id).await?;
                touched_debts.insert(task.target_id.clone());
            }
            RecalcKind::BucketAllocations => {
                recompute_bucket_allocations(storage, clock, wallet, &task.target_id).await?;
            }
            RecalcKind::BudgetSpent => {
                budget_impl::recompute_budget_spent(storage, clock, wallet, &task.target_id).await?;
            }
            RecalcKind::GoalProgress => {
                // Never emitted in the first layer; see below.
            }
        }
    }

    let second_layer = goal_tasks_for(storage, wallet, &touched_accounts, &touched_debts).await?;
    for goal_id in second_layer {
        recompute_goal_progress(storage, clock, wallet, &goal_id).await?;
    }

    Ok(())
}

async fn budget_tasks_for_transaction(
    storage: &dyn Storage,
    wallet: &WalletId,
    mutation: &MutationRecord,
) -> Result<Vec<RecalcTask>, StorageError> {
    let budgets = storage.scan_by_type(wallet, &EntityType::new("Budget")).await?;
    let mut tasks = Vec::new();
    for payload in [&mutation.old_payload, &mutation.new_payload].into_iter().flatten() {
        let category = payload.get("category").and_then(|v| v.as_str());
        let occurred_at = payload.get("occurred_at").and_then(|v| v.as_str());
        for budget in &budgets {
            if budget_matches(&budget.payload, category, occurred_at) {
                tasks.push(RecalcTask::new("Budget", budget.entity_id.clone(), RecalcKind::BudgetSpent));
            }
        }
    }
    Ok(tasks)
}

fn budget_matches(budget_payload: &Payload, category: Option<&str>, occurred_at: Option<&str>) -> bool {
    let scope_matches = match budget_payload.get("category").and_then(|v| v.as_str()) {
        None => true,
        Some(budget_category) => category == Some(budget_category),
    };
    if !scope_matches {
        return false;
    }
    let Some(occurred_at) = occurred_at.and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok()) else {
        return false;
    };
    let start = budget_payload
        .get("start_date")
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok());
    let end = budget_payload
        .get("end_date")
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok());
    match (start, end) {
        (Some(start), Some(end)) => occurred_at >= start && occurred_at <= end,
        _ => false,
    }
}

async fn goal_tasks_for(
    storage: &dyn Storage,
    wallet: &WalletId,
    touched_accounts: &HashSet<EntityId>,
    touched_debts: &HashSet<EntityId>,
) -> Result<Vec<EntityId>, StorageError> {
    if touched_accounts.is_empty() && touched_debts.is_empty() {
        return Ok(Vec::new());
    }
    let goals = storage.scan_by_type(wallet, &EntityType::new("Goal")).await?;
    let mut ids = Vec::new();
    for goal in goals {
        let linked_account = goal.payload.get("linked_account_id").and_then(|v| v.as_str());
        let linked_debt = goal.payload.get("linked_debt_id").and_then(|v| v.as_str());
        let account_hit = linked_account.map(|id| touched_accounts.contains(&EntityId::new(id))).unwrap_or(false);
        let debt_hit = linked_debt.map(|id| touched_debts.contains(&EntityId::new(id))).unwrap_or(false);
        if account_hit || debt_hit {
            ids.push(goal.entity_id);
        }
    }
    Ok(ids)
}
