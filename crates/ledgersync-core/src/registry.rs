//! Entity Registry: an ordered table of static descriptors
//! keyed by `entity_type`, each enumerating required/optional fields,
//! aliases, denied fields, server-owned fields, and a recalc hook.
//!
//! No runtime class synthesis: every descriptor here is built once, at
//! startup, from plain data plus a closure, not through any dynamic
//! metaprogramming.

use crate::entity::Payload;
use crate::identifiers::{EntityId, EntityType, WalletId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The JSON type a registered field must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// A JSON string.
    String,
    /// A JSON number with no fractional component.
    Integer,
    /// Any JSON number.
    Number,
    /// A JSON boolean.
    Bool,
    /// An ISO-8601 datetime string, normalized on ingest.
    Timestamp,
    /// An arbitrary JSON value (array/object), parsed but not type-checked
    /// further.
    Json,
}

impl FieldType {
    /// Whether `value` satisfies this field type.
    pub fn matches(self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Timestamp => value.is_string(),
            Self::Json => !matches!(value, Value::Null),
        }
    }
}

/// Which derived aggregate recomputation a mutation triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecalcKind {
    /// Sum of non-deleted transactions touching an account.
    AccountBalance,
    /// Sum of non-deleted expense transactions within a budget's scope/range.
    BudgetSpent,
    /// Save-goal balance or pay-debt-goal remainder.
    GoalProgress,
    /// Debt principal minus paid installments.
    DebtRemaining,
    /// Auto-allocation rows derived from the applicable bucket rule.
    BucketAllocations,
}

/// One unit of deferred recomputation, targeting a specific row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecalcTask {
    /// Row whose derived fields must be recomputed.
    pub target_type: EntityType,
    /// Identity of the target row.
    pub target_id: EntityId,
    /// Which recalculation to run.
    pub kind: RecalcKind,
}

impl RecalcTask {
    /// Build a new recalc task.
    pub fn new(target_type: impl Into<EntityType>, target_id: impl Into<EntityId>, kind: RecalcKind) -> Self {
        Self {
            target_type: target_type.into(),
            target_id: target_id.into(),
            kind,
        }
    }
}

/// Which write just happened, handed to a descriptor's recalc hook so it can
/// decide what to recompute. `old_payload` is `None` on create.
#[derive(Debug, Clone)]
pub struct AcceptedMutation<'a> {
    /// Wallet the mutation occurred in.
    pub wallet_id: &'a WalletId,
    /// Type of the row that was mutated.
    pub entity_type: &'a EntityType,
    /// Identity of the row that was mutated.
    pub entity_id: &'a EntityId,
    /// The row's payload before this mutation (`None` on create).
    pub old_payload: Option<&'a Payload>,
    /// The row's payload after this mutation (`None` on hard delete).
    pub new_payload: Option<&'a Payload>,
}

/// A recalc hook: pure function from an accepted mutation to the set of
/// recompute tasks it implies. Boxed so descriptors can close over nothing
/// (most hooks are simple match expressions on `entity_type`).
pub type RecalcHook = Arc<dyn Fn(&AcceptedMutation<'_>) -> Vec<RecalcTask> + Send + Sync>;

/// Static metadata for one syncable entity type.
#[derive(Clone)]
pub struct EntityDescriptor {
    /// This descriptor's entity type.
    pub entity_type: EntityType,
    /// Fields that must be present on `create`.
    pub required_on_create: HashSet<String>,
    /// Fields accepted beyond the required set.
    pub optional_fields: HashSet<String>,
    /// Maps an incoming alias key to its canonical field name.
    pub aliases: HashMap<String, String>,
    /// Fields rejected outright if present in a client payload.
    pub sensitive_fields: HashSet<String>,
    /// Fields stripped from incoming payloads; only the server ever writes
    /// them.
    pub server_authoritative_fields: HashSet<String>,
    /// Declared type for each known field, checked on ingest.
    pub field_types: HashMap<String, FieldType>,
    /// Whether this type supports soft delete (vs. hard delete).
    pub soft_delete: bool,
    /// Maps an accepted mutation to the recalc tasks it implies.
    pub recalc_hook: RecalcHook,
}

impl EntityDescriptor {
    /// Resolve an incoming field name to its canonical name.
    pub fn canonical_field_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// The table of all registered entity types.
///
/// Construction order determines nothing at runtime (lookups are by key),
/// but registrations read top-to-bottom in dependency order for humans —
/// wallet-scoped leaves first, aggregates (budgets/goals/debts/allocations)
/// last — mirroring the order those components depend on each other.
#[derive(Clone, Default)]
pub struct EntityRegistry {
    descriptors: HashMap<EntityType, EntityDescriptor>,
}

impl EntityRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, keyed by its own `entity_type`.
    pub fn register(&mut self, descriptor: EntityDescriptor) {
        self.descriptors.insert(descriptor.entity_type.clone(), descriptor);
    }

    /// Look up a descriptor by entity type.
    pub fn get(&self, entity_type: &EntityType) -> Option<&EntityDescriptor> {
        self.descriptors.get(entity_type)
    }

    /// Whether `entity_type` is registered.
    pub fn contains(&self, entity_type: &EntityType) -> bool {
        self.descriptors.contains_key(entity_type)
    }
}
