//! Debt remaining recalculator: `principal − sum(paid
//! installments)`; the debt transitions to `closed` when remaining is zero.

use ledgersync_core::{Clock, Entity, EntityId, EntityType, RowKey, WalletId};
use ledgersync_store::{Storage, StorageError};

pub async fn recompute_debt_remaining(
    storage: &dyn Storage,
    clock: &dyn Clock,
    wallet: &WalletId,
    debt_id: &EntityId,
) -> Result<(), StorageError> {
    let key = RowKey::new(EntityType::new("Debt"), debt_id.clone());
    let Some(debt) = storage.get_row(&key).await? else {
        return Ok(());
    };

    let principal = debt.payload.get("principal").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let installments = storage.scan_by_type(wallet, &EntityType::new("DebtInstallment")).await?;
    let paid: f64 = installments
        .iter()
        .filter(|i| i.payload.get("debt_id").and_then(|v| v.as_str()) == Some(debt_id.as_str()))
        .filter(|i| i.payload.get("status").and_then(|v| v.as_str()) == Some("paid"))
        .filter_map(|i| i.payload.get("amount").and_then(|v| v.as_f64()))
        .sum();

    let remaining = (principal - paid).max(0.0);
    let status = if remaining <= f64::EPSILON { "closed" } else { "open" };

    let mut payload = debt.payload.clone();
    payload.insert("remaining_amount".into(), serde_json::json!(remaining));
    payload.insert("status".into(), serde_json::Value::String(status.to_string()));
    let updated = Entity {
        doc_version: debt.doc_version + 1,
        server_modified: clock.now(wallet).await,
        payload,
        ..debt
    };
    storage.put_row(updated).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_store::MemoryStorage;
    use ledgersync_testkit::FixedClock;

    fn debt(wallet: &str, id: &str, principal: f64) -> Entity {
        let mut payload = serde_json::Map::new();
        payload.insert("principal".into(), serde_json::json!(principal));
        Entity {
            entity_type: EntityType::new("Debt"),
            entity_id: EntityId::new(id),
            wallet_id: WalletId::new(wallet),
            doc_version: 1,
            server_modified: chrono::Utc::now(),
            client_created_ms: 0,
            client_modified_ms: 0,
            is_deleted: false,
            deleted_at: None,
            payload,
        }
    }

    fn installment(wallet: &str, id: &str, debt_id: &str, amount: f64, status: &str) -> Entity {
        let mut payload = serde_json::Map::new();
        payload.insert("debt_id".into(), serde_json::Value::String(debt_id.into()));
        payload.insert("amount".into(), serde_json::json!(amount));
        payload.insert("status".into(), serde_json::Value::String(status.into()));
        Entity {
            entity_type: EntityType::new("DebtInstallment"),
            entity_id: EntityId::new(id),
            wallet_id: WalletId::new(wallet),
            doc_version: 1,
            server_modified: chrono::Utc::now(),
            client_created_ms: 0,
            client_modified_ms: 0,
            is_deleted: false,
            deleted_at: None,
            payload,
        }
    }

    #[tokio::test]
    async fn subtracts_only_paid_installments() {
        let storage = MemoryStorage::new();
        storage.put_row(debt("w1", "d1", 1000.0)).await.unwrap();
        storage.put_row(installment("w1", "i1", "d1", 300.0, "paid")).await.unwrap();
        storage.put_row(installment("w1", "i2", "d1", 200.0, "pending")).await.unwrap();
        let clock = FixedClock::starting_at(chrono::Utc::now());
        recompute_debt_remaining(&storage, &clock, &WalletId::new("w1"), &EntityId::new("d1")).await.unwrap();
        let row = storage
            .get_row(&RowKey::new(EntityType::new("Debt"), EntityId::new("d1")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.payload.get("remaining_amount").unwrap().as_f64().unwrap(), 700.0);
        assert_eq!(row.payload.get("status").unwrap().as_str().unwrap(), "open");
    }

    #[tokio::test]
    async fn closes_when_fully_paid() {
        let storage = MemoryStorage::new();
        storage.put_row(debt("w1", "d1", 500.0)).await.unwrap();
        storage.put_row(installment("w1", "i1", "d1", 500.0, "paid")).await.unwrap();
        let clock = FixedClock::starting_at(chrono::Utc::now());
        recompute_debt_remaining(&storage, &clock, &WalletId::new("w1"), &EntityId::new("d1")).await.unwrap();
        let row = storage
            .get_row(&RowKey::new(EntityType::new("Debt"), EntityId::new("d1")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.payload.get("status").unwrap().as_str().unwrap(), "closed");
    }
}
