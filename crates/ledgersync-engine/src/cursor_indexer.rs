//! Cursor Indexer: the production [`Clock`] implementation.
//! Assigns `server_modified = max(now, last_assigned + ε)` per wallet, so
//! two accepts on the same wallet never collide even when the wall clock
//! hasn't ticked between them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ledgersync_core::{Clock, WalletId};
use parking_lot::Mutex;
use std::collections::HashMap;

/// A per-wallet strictly-monotonic timestamp allocator.
pub struct MonotonicClock {
    epsilon: Duration,
    last_assigned: Mutex<HashMap<WalletId, DateTime<Utc>>>,
}

impl MonotonicClock {
    /// Build a clock ticking by `epsilon_micros` whenever the wall clock
    /// would otherwise repeat or go backward relative to the wallet's
    /// last assignment.
    pub fn new(epsilon_micros: i64) -> Self {
        Self {
            epsilon: Duration::microseconds(epsilon_micros.max(1)),
            last_assigned: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl Clock for MonotonicClock {
    async fn now(&self, wallet: &WalletId) -> DateTime<Utc> {
        let mut guard = self.last_assigned.lock();
        let candidate = Utc::now();
        let next = match guard.get(wallet) {
            Some(prev) if *prev >= candidate => *prev + self.epsilon,
            _ => candidate,
        };
        guard.insert(wallet.clone(), next);
        next
    }
}
