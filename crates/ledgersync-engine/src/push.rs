//! Push Orchestrator: `push(scope, items[])`.
//!
//! Top-level validation rejects the whole batch; everything after that
//! point is isolated per item — a failure at item `i` is recorded and
//! reported without touching items before or after it.
//!
//! "every `entity_type` is in the allowlist" is enforced at the *shape*
//! level here (must be a non-empty string) rather than the *registration*
//! level, since the latter would make the item-level
//! `unsupported_entity_type` error code unreachable. See `DESIGN.md`.

use crate::recalc::{self, MutationRecord};
use crate::{ledger, normalizer, version_controller};
use ledgersync_core::entity::Payload;
use ledgersync_core::wire::BaseVersionError;
use ledgersync_core::{
    Clock, EngineConfig, EntityId, EntityRegistry, EntityType, Error, ItemErrorCode, OpId, PushItem, PushItemResult,
    PushResponse, Result, RowKey, Scope,
};
use ledgersync_store::Storage;

/// Run one push batch to completion.
pub async fn push(
    storage: &dyn Storage,
    clock: &dyn Clock,
    registry: &EntityRegistry,
    config: &EngineConfig,
    scope: &Scope,
    items: Vec<PushItem>,
) -> Result<PushResponse> {
    if !scope.role.can_mutate() {
        return Err(Error::forbidden("viewer role cannot submit push mutations"));
    }
    if items.is_empty() {
        return Err(Error::invalid_request("items must be a non-empty list"));
    }
    if items.len() > config.max_push_batch {
        return Err(Error::invalid_request(format!(
            "items exceeds the maximum batch size of {}",
            config.max_push_batch
        )));
    }
    for item in &items {
        if item.entity_type.trim().is_empty() {
            return Err(Error::invalid_request("every item must declare a non-empty entity_type"));
        }
    }

    tracing::info!(wallet_id = %scope.wallet, device_id = %scope.device, item_count = items.len(), "push batch received");

    let mut results = Vec::with_capacity(items.len());
    let mut mutations = Vec::new();

    for item in items {
        let op_id = OpId::new(item.op_id.clone());

        if let Some(prior_result) = ledger::lookup(storage, &scope.user, &scope.device, &op_id)
            .await
            .map_err(|e| Error::storage(e.to_string()))?
        {
            tracing::debug!(op_id = %op_id, "replayed push item short-circuited by ledger");
            results.push(prior_result);
            continue;
        }

        let echoed_entity_type = (!item.entity_type.is_empty()).then(|| EntityType::new(item.entity_type.clone()));
        let echoed_client_id = (!item.entity_id.is_empty()).then(|| EntityId::new(item.entity_id.clone()));

        let result = apply_one_item(storage, clock, registry, config, scope, &item, &mut mutations)
            .await
            .unwrap_or_else(|err| error_result(echoed_entity_type, echoed_client_id, err));

        if matches!(result, PushItemResult::Conflict { .. } | PushItemResult::Error { .. }) {
            tracing::warn!(op_id = %op_id, "push item did not apply cleanly");
        } else {
            tracing::debug!(op_id = %op_id, "push item applied");
        }

        let recorded_result = ledger::record(
            storage,
            &scope.user,
            &scope.device,
            &op_id,
            result,
            clock.now(&scope.wallet).await,
        )
        .await
        .map_err(|e| Error::storage(e.to_string()))?;
        results.push(recorded_result);
    }

    recalc::run(storage, clock, registry, &scope.wallet, &mutations)
        .await
        .map_err(|e| Error::storage(e.to_string()))?;

    Ok(PushResponse {
        results,
        server_time: clock.now(&scope.wallet).await,
    })
}

async fn apply_one_item(
    storage: &dyn Storage,
    clock: &dyn Clock,
    registry: &EntityRegistry,
    config: &EngineConfig,
    scope: &Scope,
    item: &PushItem,
    mutations: &mut Vec<MutationRecord>,
) -> Result<PushItemResult> {
    let (entity_type, operation, entity_id, normalized) = normalizer::normalize(
        registry,
        config,
        &item.entity_type,
        &item.operation,
        &item.entity_id,
        &item.payload,
        &scope.wallet,
    )?;

    let descriptor = registry
        .get(&entity_type)
        .ok_or_else(|| Error::item(ItemErrorCode::UnsupportedEntityType))?;

    let base_version = match operation {
        ledgersync_core::OperationKind::Create => item
            .base_version_for_create()
            .ok_or_else(|| Error::item(ItemErrorCode::BaseVersionInvalid))?,
        ledgersync_core::OperationKind::Update | ledgersync_core::OperationKind::Delete => item
            .base_version_required()
            .map_err(|e| match e {
                BaseVersionError::Required => Error::item(ItemErrorCode::BaseVersionRequired),
                BaseVersionError::Invalid => Error::item(ItemErrorCode::BaseVersionInvalid),
            })?,
    };

    let key = RowKey::new(entity_type.clone(), entity_id.clone());
    let before: Option<Payload> = storage
        .get_row(&key)
        .await
        .map_err(|e| Error::storage(e.to_string()))?
        .map(|e| e.payload);

    let now = clock.now(&scope.wallet).await;
    let outcome = version_controller::apply(
        storage,
        descriptor,
        &scope.wallet,
        &entity_type,
        &entity_id,
        operation,
        normalized.payload,
        normalized.client_created_ms,
        normalized.client_modified_ms,
        base_version,
        now,
    )
    .await
    .map_err(|e| Error::storage(e.to_string()))?;

    let after = match &outcome {
        version_controller::VersionOutcome::Accepted(e) => Some(e.payload.clone()),
        version_controller::VersionOutcome::HardDeleted(_) => None,
        _ => None,
    };
    let mutated = matches!(
        outcome,
        version_controller::VersionOutcome::Accepted(_) | version_controller::VersionOutcome::HardDeleted(_)
    );
    if mutated {
        mutations.push(MutationRecord {
            entity_type: entity_type.clone(),
            entity_id: entity_id.clone(),
            old_payload: before,
            new_payload: after,
        });
    }

    Ok(outcome.into_push_result(entity_type, entity_id, base_version))
}

fn error_result(entity_type: Option<EntityType>, client_id: Option<EntityId>, err: Error) -> PushItemResult {
    let (error_code, error_message) = match err {
        Error::Item { code, message } => (code, message),
        other => (ItemErrorCode::NotFound, other.to_string()),
    };
    PushItemResult::Error {
        entity_type,
        client_id,
        error_code,
        error_message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_store::MemoryStorage;
    use ledgersync_testkit::{owner_scope, payload, FixedClock};

    fn registry() -> EntityRegistry {
        crate::registry_defs::build()
    }

    fn create_item(op_id: &str, entity_id: &str, extra: &[(&str, serde_json::Value)]) -> PushItem {
        PushItem {
            op_id: op_id.to_string(),
            entity_type: "Account".to_string(),
            entity_id: entity_id.to_string(),
            operation: "create".to_string(),
            payload: payload(entity_id, extra),
            base_version: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn create_accepted_returns_doc_version_one() {
        let storage = MemoryStorage::new();
        let clock = FixedClock::starting_at(chrono::Utc::now());
        let registry = registry();
        let config = EngineConfig::default();
        let scope = owner_scope("u1", "d1", "w1");

        let item = create_item(
            "o1",
            "acc-1",
            &[
                ("name".into(), serde_json::json!("Cash")),
                ("currency".into(), serde_json::json!("SAR")),
            ],
        );
        let response = push(&storage, &clock, &registry, &config, &scope, vec![item]).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert!(matches!(response.results[0], PushItemResult::Accepted { doc_version: 1, .. }));
    }

    #[tokio::test]
    async fn duplicate_op_id_replays_exact_result() {
        let storage = MemoryStorage::new();
        let clock = FixedClock::starting_at(chrono::Utc::now());
        let registry = registry();
        let config = EngineConfig::default();
        let scope = owner_scope("u1", "d1", "w1");

        let extra = [("name".into(), serde_json::json!("Cash")), ("currency".into(), serde_json::json!("SAR"))];
        let first = push(&storage, &clock, &registry, &config, &scope, vec![create_item("o1", "acc-1", &extra)])
            .await
            .unwrap();
        let second = push(&storage, &clock, &registry, &config, &scope, vec![create_item("o1", "acc-1", &extra)])
            .await
            .unwrap();
        assert_eq!(first.results.len(), 1);
        match (&first.results[0], &second.results[0]) {
            (PushItemResult::Accepted { doc_version: v1, .. }, PushItemResult::Accepted { doc_version: v2, .. }) => {
                assert_eq!(v1, v2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn conflicting_update_does_not_mutate_row() {
        let storage = MemoryStorage::new();
        let clock = FixedClock::starting_at(chrono::Utc::now());
        let registry = registry();
        let config = EngineConfig::default();
        let scope = owner_scope("u1", "d1", "w1");

        let extra = [("name".into(), serde_json::json!("Cash")), ("currency".into(), serde_json::json!("SAR"))];
        push(&storage, &clock, &registry, &config, &scope, vec![create_item("o1", "acc-1", &extra)])
            .await
            .unwrap();

        let update_item = PushItem {
            op_id: "o2".to_string(),
            entity_type: "Account".to_string(),
            entity_id: "acc-1".to_string(),
            operation: "update".to_string(),
            payload: payload("acc-1", &[("name".into(), serde_json::json!("Wallet"))]),
            base_version: serde_json::json!(0),
        };
        let response = push(&storage, &clock, &registry, &config, &scope, vec![update_item]).await.unwrap();
        assert!(matches!(response.results[0], PushItemResult::Conflict { .. }));
    }

    #[tokio::test]
    async fn batch_larger_than_configured_cap_is_rejected_as_a_whole() {
        let storage = MemoryStorage::new();
        let clock = FixedClock::starting_at(chrono::Utc::now());
        let registry = registry();
        let mut config = EngineConfig::default();
        config.max_push_batch = 1;
        let scope = owner_scope("u1", "d1", "w1");
        let extra = [("name".into(), serde_json::json!("Cash")), ("currency".into(), serde_json::json!("SAR"))];
        let items = vec![create_item("o1", "acc-1", &extra), create_item("o2", "acc-2", &extra)];
        let err = push(&storage, &clock, &registry, &config, &scope, items).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn unknown_entity_type_is_an_item_level_error_not_a_batch_rejection() {
        let storage = MemoryStorage::new();
        let clock = FixedClock::starting_at(chrono::Utc::now());
        let registry = registry();
        let config = EngineConfig::default();
        let scope = owner_scope("u1", "d1", "w1");
        let item = PushItem {
            op_id: "o1".to_string(),
            entity_type: "Ghost".to_string(),
            entity_id: "x-1".to_string(),
            operation: "create".to_string(),
            payload: payload("x-1", &[]),
            base_version: serde_json::Value::Null,
        };
        let response = push(&storage, &clock, &registry, &config, &scope, vec![item]).await.unwrap();
        assert!(matches!(
            response.results[0],
            PushItemResult::Error { error_code: ItemErrorCode::UnsupportedEntityType, .. }
        ));
    }
}
