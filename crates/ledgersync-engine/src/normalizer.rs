//! Payload Normalizer: canonicalizes payload keys, enforces
//! types, strips server-owned fields, rejects sensitive fields. Applied in
//! a fixed rule order, even where that order looks slightly out of
//! sequence (rule 3 inspects `payload.client_id` before rule 4 has
//! formally confirmed the payload is a map — we check "is it a map" first
//! in practice, since there is no other way to read `client_id`).

use chrono::{DateTime, Utc};
use ledgersync_core::entity::{clamp_i32_ms, Payload};
use ledgersync_core::registry::{EntityRegistry, FieldType};
use ledgersync_core::{EngineConfig, EntityId, EntityType, Error, ItemErrorCode, OperationKind, WalletId};
use serde_json::Value;

const WALLET_ENTITY_TYPE: &str = "Wallet";

/// Result of normalizing one push item's payload: the canonical payload
/// plus the client-supplied creation/modification times, clamped.
pub struct Normalized {
    /// Canonicalized, validated, server-field-stripped payload.
    pub payload: Payload,
    /// Clamped `client_created_ms` (0 if the client omitted it).
    pub client_created_ms: i64,
    /// Clamped `client_modified_ms` (0 if the client omitted it).
    pub client_modified_ms: i64,
}

/// Run the full normalization pipeline for one push item.
#[allow(clippy::too_many_arguments)]
pub fn normalize(
    registry: &EntityRegistry,
    config: &EngineConfig,
    entity_type_raw: &str,
    operation_raw: &str,
    entity_id_raw: &str,
    raw_payload: &Value,
    request_wallet: &WalletId,
) -> Result<(EntityType, OperationKind, EntityId, Normalized), Error> {
    // Rule 1: entity_type present and registered.
    if entity_type_raw.is_empty() {
        return Err(Error::item(ItemErrorCode::EntityTypeRequired));
    }
    let entity_type = EntityType::new(entity_type_raw);
    let descriptor = registry
        .get(&entity_type)
        .ok_or_else(|| Error::item(ItemErrorCode::UnsupportedEntityType))?;

    // Rule 2: operation is one of create/update/delete.
    let operation = OperationKind::parse(operation_raw)
        .ok_or_else(|| Error::item(ItemErrorCode::InvalidOperation))?;

    // Rule 4 (checked early, out of necessity): payload must be an object.
    let raw_map = raw_payload
        .as_object()
        .ok_or_else(|| Error::item(ItemErrorCode::PayloadMustBeObject))?;

    // Rule 3: entity_id present, equal to payload.client_id.
    if entity_id_raw.is_empty() {
        return Err(Error::item(ItemErrorCode::EntityIdRequired));
    }
    let client_id = raw_map
        .get("client_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::item(ItemErrorCode::InvalidClientId))?;
    if client_id != entity_id_raw {
        return Err(Error::item(ItemErrorCode::EntityIdMismatch));
    }
    let entity_id = EntityId::new(entity_id_raw);

    // Rule 5: wallet scoping.
    let mut canonical = Payload::new();
    if entity_type.as_str() == WALLET_ENTITY_TYPE {
        if request_wallet.as_str() != entity_id_raw {
            return Err(Error::item(ItemErrorCode::WalletIdMustEqualClientId));
        }
        if let Some(supplied) = raw_map.get("wallet_id").and_then(Value::as_str) {
            if supplied != entity_id_raw {
                return Err(Error::item(ItemErrorCode::WalletIdMustEqualClientId));
            }
        }
    } else if let Some(supplied) = raw_map.get("wallet_id").and_then(Value::as_str) {
        if supplied != request_wallet.as_str() {
            return Err(Error::item(ItemErrorCode::WalletIdMismatch));
        }
    }
    canonical.insert("wallet_id".into(), Value::String(request_wallet.0.clone()));
    canonical.insert("client_id".into(), Value::String(entity_id_raw.to_string()));

    // Rules 6-7: alias rewrite, then sensitive-field rejection, over every
    // field except the ones already placed above.
    for (raw_key, value) in raw_map {
        if raw_key == "client_id" || raw_key == "wallet_id" || raw_key == "client_created_ms" || raw_key == "client_modified_ms" {
            continue;
        }
        let canonical_key = descriptor.canonical_field_name(raw_key).to_string();
        if descriptor.sensitive_fields.contains(&canonical_key) {
            return Err(Error::item_detail(
                ItemErrorCode::SensitiveFieldNotAllowed,
                format!("field '{canonical_key}' is not allowed in sync payloads"),
            ));
        }
        if descriptor.server_authoritative_fields.contains(&canonical_key) {
            // Rule 10: server-owned fields are stripped, not errored.
            continue;
        }
        canonical.insert(canonical_key, value.clone());
    }

    // Rule 8: required-on-create fields present.
    if operation == OperationKind::Create {
        let missing: Vec<&str> = descriptor
            .required_on_create
            .iter()
            .filter(|f| !canonical.contains_key(f.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(Error::item_detail(
                ItemErrorCode::MissingRequiredFields,
                format!("missing required fields: {}", missing.join(", ")),
            ));
        }
    }

    // Rule 9 + 11 + 12: per-field type check, timestamp/JSON normalization.
    for (key, field_type) in &descriptor.field_types {
        let Some(value) = canonical.get(key) else {
            continue;
        };
        if !field_type.matches(value) {
            return Err(Error::item_detail(
                ItemErrorCode::InvalidFieldType,
                format!("field '{key}' does not match its declared type"),
            ));
        }
        if *field_type == FieldType::Timestamp {
            if let Some(s) = value.as_str() {
                let canonical_ts = normalize_timestamp(s).ok_or_else(|| {
                    Error::item_detail(
                        ItemErrorCode::InvalidFieldType,
                        format!("field '{key}' is not a valid timestamp"),
                    )
                })?;
                canonical.insert(key.clone(), Value::String(canonical_ts));
            }
        }
    }

    // Rule 13: payload size cap.
    let encoded_len = serde_json::to_vec(&canonical)
        .map_err(|e| Error::item_detail(ItemErrorCode::PayloadTooLarge, e.to_string()))?
        .len();
    if encoded_len > config.max_payload_bytes {
        return Err(Error::item(ItemErrorCode::PayloadTooLarge));
    }

    // Rule 14: int32-clamp client-supplied times.
    let client_created_ms = raw_map
        .get("client_created_ms")
        .and_then(Value::as_i64)
        .map(clamp_i32_ms)
        .unwrap_or(0);
    let client_modified_ms = raw_map
        .get("client_modified_ms")
        .and_then(Value::as_i64)
        .map(clamp_i32_ms)
        .unwrap_or(0);

    Ok((
        entity_type,
        operation,
        entity_id,
        Normalized {
            payload: canonical,
            client_created_ms,
            client_modified_ms,
        },
    ))
}

/// Parse a datetime string in any reasonable input form and re-render it
/// canonically as RFC 3339.
fn normalize_timestamp(raw: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).to_rfc3339());
    }
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_core::registry::{AcceptedMutation, EntityDescriptor, RecalcTask};
    use serde_json::json;
    use std::collections::HashMap;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn account_registry() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        registry.register(EntityDescriptor {
            entity_type: EntityType::new("Account"),
            required_on_create: ["name", "currency"].iter().map(|s| s.to_string()).collect(),
            optional_fields: HashSet::new(),
            aliases: [("accountId".to_string(), "account_type".to_string())]
                .into_iter()
                .collect(),
            sensitive_fields: ["api_secret".to_string()].into_iter().collect(),
            server_authoritative_fields: ["current_balance".to_string()].into_iter().collect(),
            field_types: [("name".to_string(), FieldType::String)].into_iter().collect(),
            soft_delete: true,
            recalc_hook: Arc::new(|_: &AcceptedMutation<'_>| Vec::<RecalcTask>::new()),
        });
        registry
    }

    #[test]
    fn accepts_well_formed_create() {
        let registry = account_registry();
        let wallet = WalletId::new("w1");
        let payload = json!({"client_id": "acc-1", "name": "Cash", "currency": "SAR"});
        let (entity_type, op, entity_id, normalized) =
            normalize(&registry, &EngineConfig::default(), "Account", "create", "acc-1", &payload, &wallet).unwrap();
        assert_eq!(entity_type.as_str(), "Account");
        assert_eq!(op, OperationKind::Create);
        assert_eq!(entity_id.as_str(), "acc-1");
        assert_eq!(normalized.payload.get("wallet_id").unwrap(), "w1");
    }

    #[test]
    fn rejects_unsupported_entity_type() {
        let registry = account_registry();
        let wallet = WalletId::new("w1");
        let payload = json!({"client_id": "x-1"});
        let err = normalize(&registry, &EngineConfig::default(), "Ghost", "create", "x-1", &payload, &wallet).unwrap_err();
        assert_matches::assert_matches!(err, Error::Item { code: ItemErrorCode::UnsupportedEntityType, .. });
    }

    #[test]
    fn rejects_entity_id_mismatch() {
        let registry = account_registry();
        let wallet = WalletId::new("w1");
        let payload = json!({"client_id": "other"});
        let err = normalize(&registry, &EngineConfig::default(), "Account", "create", "acc-1", &payload, &wallet).unwrap_err();
        assert_matches::assert_matches!(err, Error::Item { code: ItemErrorCode::EntityIdMismatch, .. });
    }

    #[test]
    fn rejects_missing_required_fields_on_create() {
        let registry = account_registry();
        let wallet = WalletId::new("w1");
        let payload = json!({"client_id": "acc-1"});
        let err = normalize(&registry, &EngineConfig::default(), "Account", "create", "acc-1", &payload, &wallet).unwrap_err();
        assert_matches::assert_matches!(err, Error::Item { code: ItemErrorCode::MissingRequiredFields, .. });
    }

    #[test]
    fn strips_server_authoritative_fields() {
        let registry = account_registry();
        let wallet = WalletId::new("w1");
        let payload = json!({"client_id": "acc-1", "name": "Cash", "currency": "SAR", "current_balance": 999});
        let (_, _, _, normalized) =
            normalize(&registry, &EngineConfig::default(), "Account", "create", "acc-1", &payload, &wallet).unwrap();
        assert!(!normalized.payload.contains_key("current_balance"));
    }

    #[test]
    fn rejects_sensitive_fields() {
        let registry = account_registry();
        let wallet = WalletId::new("w1");
        let payload = json!({"client_id": "acc-1", "name": "Cash", "currency": "SAR", "api_secret": "shh"});
        let err = normalize(&registry, &EngineConfig::default(), "Account", "create", "acc-1", &payload, &wallet).unwrap_err();
        assert_matches::assert_matches!(err, Error::Item { code: ItemErrorCode::SensitiveFieldNotAllowed, .. });
    }

    #[test]
    fn rejects_wallet_id_mismatch() {
        let registry = account_registry();
        let wallet = WalletId::new("w1");
        let payload = json!({"client_id": "acc-1", "name": "Cash", "currency": "SAR", "wallet_id": "w2"});
        let err = normalize(&registry, &EngineConfig::default(), "Account", "create", "acc-1", &payload, &wallet).unwrap_err();
        assert_matches::assert_matches!(err, Error::Item { code: ItemErrorCode::WalletIdMismatch, .. });
    }

    #[test]
    fn rejects_invalid_operation() {
        let registry = account_registry();
        let wallet = WalletId::new("w1");
        let payload = json!({"client_id": "acc-1", "name": "Cash", "currency": "SAR"});
        let err = normalize(&registry, &EngineConfig::default(), "Account", "spindle", "acc-1", &payload, &wallet).unwrap_err();
        assert_matches::assert_matches!(err, Error::Item { code: ItemErrorCode::InvalidOperation, .. });
    }

    #[test]
    fn clamp_target_fields_are_stripped_from_canonical_payload() {
        let registry = account_registry();
        let wallet = WalletId::new("w1");
        let payload = json!({
            "client_id": "acc-1",
            "name": "Cash",
            "currency": "SAR",
            "client_created_ms": i64::MAX,
            "client_modified_ms": i64::MAX,
        });
        let (_, _, _, normalized) =
            normalize(&registry, &EngineConfig::default(), "Account", "create", "acc-1", &payload, &wallet).unwrap();
        assert!(!normalized.payload.contains_key("client_created_ms"));
        assert!(!normalized.payload.contains_key("client_modified_ms"));
        assert_eq!(normalized.client_created_ms, i32::MAX as i64);
        assert_eq!(normalized.client_modified_ms, i32::MAX as i64);
    }

    #[test]
    fn aliases_rewrite_to_canonical_field_name() {
        let registry = account_registry();
        let wallet = WalletId::new("w1");
        let payload = json!({"client_id": "acc-1", "name": "Cash", "currency": "SAR", "accountId": "checking"});
        let (_, _, _, normalized) =
            normalize(&registry, &EngineConfig::default(), "Account", "create", "acc-1", &payload, &wallet).unwrap();
        assert_eq!(normalized.payload.get("account_type").unwrap(), "checking");
        assert!(!normalized.payload.contains_key("accountId"));
    }
}
