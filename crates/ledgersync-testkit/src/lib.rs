//! Shared test fixtures, kept in their own crate the way test-support code
//! is split from production code: nothing here ships in a production
//! binary, but every engine test depends on it.

pub use ledgersync_store::MemoryStorage;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ledgersync_core::{Clock, DeviceId, Role, Scope, UserId, WalletId};
use parking_lot::Mutex;
use std::collections::HashMap;

/// A [`Clock`] that advances by one microsecond per call from a fixed
/// starting instant, independent of wall time — deterministic tests need a
/// clock that doesn't depend on how fast the test runner executes.
pub struct FixedClock {
    next: Mutex<HashMap<WalletId, DateTime<Utc>>>,
    start: DateTime<Utc>,
}

impl FixedClock {
    /// A clock that starts ticking from `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            next: Mutex::new(HashMap::new()),
            start,
        }
    }
}

#[async_trait]
impl Clock for FixedClock {
    async fn now(&self, wallet: &WalletId) -> DateTime<Utc> {
        let mut guard = self.next.lock();
        let entry = guard.entry(wallet.clone()).or_insert(self.start);
        let assigned = *entry;
        *entry += Duration::microseconds(1);
        assigned
    }
}

/// Build a scope for a device with full write access to a wallet, the
/// shape most tests need.
pub fn owner_scope(user: &str, device: &str, wallet: &str) -> Scope {
    Scope::new(UserId::new(user), DeviceId::new(device), WalletId::new(wallet), Role::Owner)
}

/// Build a minimal `create` payload with just `client_id` plus whatever
/// extra fields the caller supplies.
pub fn payload(client_id: &str, extra: &[(&str, serde_json::Value)]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("client_id".to_string(), serde_json::Value::String(client_id.to_string()));
    for (key, value) in extra {
        map.insert(key.to_string(), value.clone());
    }
    serde_json::Value::Object(map)
}
