//! Concrete [`EntityDescriptor`] registrations for the seven syncable
//! types named by recalculators, plus `Wallet` itself.
//!
//! Field names below are the canonical names every alias resolves to;
//! `recalc_hook` closures return the *first-layer* recalc tasks implied by
//! a mutation — the dispatcher (`recalc::run`) expands these
//! into the second-layer `GoalProgress`/`BudgetSpent` tasks that depend on
//! an account's or debt's *already-recomputed* aggregate.

use ledgersync_core::registry::{AcceptedMutation, EntityDescriptor, FieldType, RecalcKind, RecalcTask};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn types(items: &[(&str, FieldType)]) -> HashMap<String, FieldType> {
    items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn transaction_account_ids(payload: Option<&ledgersync_core::Payload>) -> Vec<String> {
    let Some(payload) = payload else { return Vec::new() };
    let mut ids = Vec::new();
    if let Some(id) = payload.get("account_id").and_then(|v| v.as_str()) {
        ids.push(id.to_string());
    }
    if let Some(id) = payload.get("to_account_id").and_then(|v| v.as_str()) {
        ids.push(id.to_string());
    }
    ids
}

/// Build the registry used by the sync engine.
pub fn build() -> ledgersync_core::EntityRegistry {
    let mut registry = ledgersync_core::EntityRegistry::new();

    registry.register(EntityDescriptor {
        entity_type: "Wallet".into(),
        required_on_create: set(&["name"]),
        optional_fields: HashSet::new(),
        aliases: HashMap::new(),
        sensitive_fields: HashSet::new(),
        server_authoritative_fields: HashSet::new(),
        field_types: types(&[("name", FieldType::String)]),
        soft_delete: false,
        recalc_hook: Arc::new(|_: &AcceptedMutation<'_>| Vec::new()),
    });

    registry.register(EntityDescriptor {
        entity_type: "Account".into(),
        required_on_create: set(&["name", "currency"]),
        optional_fields: set(&["account_type"]),
        aliases: [("accountId".to_string(), "account_type".to_string()), ("type".to_string(), "account_type".to_string())]
            .into_iter()
            .collect(),
        sensitive_fields: HashSet::new(),
        server_authoritative_fields: set(&["current_balance"]),
        field_types: types(&[
            ("name", FieldType::String),
            ("currency", FieldType::String),
            ("account_type", FieldType::String),
            ("current_balance", FieldType::Number),
        ]),
        soft_delete: true,
        recalc_hook: Arc::new(|_: &AcceptedMutation<'_>| Vec::new()),
    });

    registry.register(EntityDescriptor {
        entity_type: "Transaction".into(),
        required_on_create: set(&["account_id", "amount", "transaction_type", "occurred_at"]),
        optional_fields: set(&["to_account_id", "category", "bucket_rule_id"]),
        aliases: [("type".to_string(), "transaction_type".to_string()), ("date".to_string(), "occurred_at".to_string())]
            .into_iter()
            .collect(),
        sensitive_fields: HashSet::new(),
        server_authoritative_fields: HashSet::new(),
        field_types: types(&[
            ("account_id", FieldType::String),
            ("to_account_id", FieldType::String),
            ("amount", FieldType::Number),
            ("transaction_type", FieldType::String),
            ("category", FieldType::String),
            ("occurred_at", FieldType::Timestamp),
            ("bucket_rule_id", FieldType::String),
        ]),
        soft_delete: true,
        recalc_hook: Arc::new(|mutation: &AcceptedMutation<'_>| {
            let mut tasks = Vec::new();
            let mut account_ids: HashSet<String> = HashSet::new();
            account_ids.extend(transaction_account_ids(mutation.old_payload));
            account_ids.extend(transaction_account_ids(mutation.new_payload));
            for account_id in account_ids {
                tasks.push(RecalcTask::new("Account", account_id, RecalcKind::AccountBalance));
            }
            let is_income = mutation
                .new_payload
                .and_then(|p| p.get("transaction_type"))
                .and_then(|v| v.as_str())
                .map(|t| t == "income")
                .unwrap_or(false);
            if is_income {
                tasks.push(RecalcTask::new(
                    "Transaction",
                    mutation.entity_id.clone(),
                    RecalcKind::BucketAllocations,
                ));
            }
            tasks
        }),
    });

    registry.register(EntityDescriptor {
        entity_type: "Budget".into(),
        required_on_create: set(&["name", "start_date", "end_date"]),
        optional_fields: set(&["category"]),
        aliases: HashMap::new(),
        sensitive_fields: HashSet::new(),
        server_authoritative_fields: set(&["spent_amount"]),
        field_types: types(&[
            ("name", FieldType::String),
            ("category", FieldType::String),
            ("start_date", FieldType::Timestamp),
            ("end_date", FieldType::Timestamp),
            ("spent_amount", FieldType::Number),
        ]),
        soft_delete: true,
        recalc_hook: Arc::new(|_: &AcceptedMutation<'_>| Vec::new()),
    });

    registry.register(EntityDescriptor {
        entity_type: "Goal".into(),
        required_on_create: set(&["goal_type", "target_amount"]),
        optional_fields: set(&["linked_account_id", "linked_debt_id"]),
        aliases: HashMap::new(),
        sensitive_fields: HashSet::new(),
        server_authoritative_fields: set(&["progress_amount"]),
        field_types: types(&[
            ("goal_type", FieldType::String),
            ("target_amount", FieldType::Number),
            ("linked_account_id", FieldType::String),
            ("linked_debt_id", FieldType::String),
            ("progress_amount", FieldType::Number),
        ]),
        soft_delete: true,
        recalc_hook: Arc::new(|_: &AcceptedMutation<'_>| Vec::new()),
    });

    registry.register(EntityDescriptor {
        entity_type: "Debt".into(),
        required_on_create: set(&["principal"]),
        optional_fields: set(&["status"]),
        aliases: HashMap::new(),
        sensitive_fields: HashSet::new(),
        server_authoritative_fields: set(&["remaining_amount", "status"]),
        field_types: types(&[
            ("principal", FieldType::Number),
            ("remaining_amount", FieldType::Number),
            ("status", FieldType::String),
        ]),
        soft_delete: true,
        recalc_hook: Arc::new(|_: &AcceptedMutation<'_>| Vec::new()),
    });

    registry.register(EntityDescriptor {
        entity_type: "DebtInstallment".into(),
        required_on_create: set(&["debt_id", "amount", "status"]),
        optional_fields: HashSet::new(),
        aliases: HashMap::new(),
        sensitive_fields: HashSet::new(),
        server_authoritative_fields: HashSet::new(),
        field_types: types(&[
            ("debt_id", FieldType::String),
            ("amount", FieldType::Number),
            ("status", FieldType::String),
        ]),
        soft_delete: true,
        recalc_hook: Arc::new(|mutation: &AcceptedMutation<'_>| {
            let mut debt_ids: HashSet<String> = HashSet::new();
            for payload in [mutation.old_payload, mutation.new_payload].into_iter().flatten() {
                if let Some(id) = payload.get("debt_id").and_then(|v| v.as_str()) {
                    debt_ids.insert(id.to_string());
                }
            }
            debt_ids
                .into_iter()
                .map(|id| RecalcTask::new("Debt", id, RecalcKind::DebtRemaining))
                .collect()
        }),
    });

    registry.register(EntityDescriptor {
        entity_type: "BucketRule".into(),
        required_on_create: set(&["scope_type", "allocations"]),
        optional_fields: set(&["account_id", "income_category"]),
        aliases: HashMap::new(),
        sensitive_fields: HashSet::new(),
        server_authoritative_fields: HashSet::new(),
        field_types: types(&[
            ("scope_type", FieldType::String),
            ("account_id", FieldType::String),
            ("income_category", FieldType::String),
            ("allocations", FieldType::Json),
        ]),
        soft_delete: true,
        recalc_hook: Arc::new(|_: &AcceptedMutation<'_>| Vec::new()),
    });

    registry.register(EntityDescriptor {
        entity_type: "BucketAllocation".into(),
        required_on_create: set(&["transaction_id", "category", "amount"]),
        optional_fields: set(&["bucket_rule_id", "manual"]),
        aliases: HashMap::new(),
        sensitive_fields: HashSet::new(),
        server_authoritative_fields: HashSet::new(),
        field_types: types(&[
            ("transaction_id", FieldType::String),
            ("bucket_rule_id", FieldType::String),
            ("category", FieldType::String),
            ("amount", FieldType::Number),
            ("manual", FieldType::Bool),
        ]),
        soft_delete: true,
        recalc_hook: Arc::new(|_: &AcceptedMutation<'_>| Vec::new()),
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_seven_syncable_types_plus_wallet() {
        let registry = build();
        for t in [
            "Wallet",
            "Account",
            "Transaction",
            "Budget",
            "Goal",
            "Debt",
            "DebtInstallment",
            "BucketRule",
            "BucketAllocation",
        ] {
            assert!(registry.contains(&ledgersync_core::EntityType::new(t)), "missing {t}");
        }
    }

    #[test]
    fn transaction_hook_emits_account_balance_task_on_create() {
        let registry = build();
        let descriptor = registry.get(&ledgersync_core::EntityType::new("Transaction")).unwrap();
        let mut payload = ledgersync_core::Payload::new();
        payload.insert("account_id".into(), serde_json::Value::String("acc-1".into()));
        payload.insert("transaction_type".into(), serde_json::Value::String("expense".into()));
        let mutation = AcceptedMutation {
            wallet_id: &ledgersync_core::WalletId::new("w1"),
            entity_type: &ledgersync_core::EntityType::new("Transaction"),
            entity_id: &ledgersync_core::EntityId::new("txn-1"),
            old_payload: None,
            new_payload: Some(&payload),
        };
        let tasks = (descriptor.recalc_hook)(&mutation);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].kind, RecalcKind::AccountBalance);
    }

    #[test]
    fn income_transaction_also_emits_bucket_allocations_task() {
        let registry = build();
        let descriptor = registry.get(&ledgersync_core::EntityType::new("Transaction")).unwrap();
        let mut payload = ledgersync_core::Payload::new();
        payload.insert("account_id".into(), serde_json::Value::String("acc-1".into()));
        payload.insert("transaction_type".into(), serde_json::Value::String("income".into()));
        let mutation = AcceptedMutation {
            wallet_id: &ledgersync_core::WalletId::new("w1"),
            entity_type: &ledgersync_core::EntityType::new("Transaction"),
            entity_id: &ledgersync_core::EntityId::new("txn-1"),
            old_payload: None,
            new_payload: Some(&payload),
        };
        let tasks = (descriptor.recalc_hook)(&mutation);
        assert!(tasks.iter().any(|t| t.kind == RecalcKind::BucketAllocations));
    }
}
