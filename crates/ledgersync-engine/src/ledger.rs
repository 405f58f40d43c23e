//! Operation Ledger: deduplicates replays keyed by
//! `(user, device, op_id)`. Lookup runs before any mutation; recording is
//! the final step of an accepted item.

use ledgersync_core::{DeviceId, LedgerKey, OpId, PushItemResult, UserId};
use ledgersync_store::{LedgerRecord, Storage, StorageError};

/// A prior result for this `(user, device, op_id)`, or `None` if this is
/// the first time the server has seen it.
pub async fn lookup(
    storage: &dyn Storage,
    user: &UserId,
    device: &DeviceId,
    op_id: &OpId,
) -> Result<Option<PushItemResult>, StorageError> {
    let key = LedgerKey::new(user.clone(), device.clone(), op_id.clone());
    Ok(storage.ledger_lookup(&key).await?.map(|record| record.result))
}

/// Record the terminal outcome of a push item. On `op_id` collision (a
/// concurrent request recorded first), returns that prior result instead
/// of overwriting — the caller must report the returned result, not the
/// one it computed, to honor replay-equivalence.
pub async fn record(
    storage: &dyn Storage,
    user: &UserId,
    device: &DeviceId,
    op_id: &OpId,
    result: PushItemResult,
    recorded_at: chrono::DateTime<chrono::Utc>,
) -> Result<PushItemResult, StorageError> {
    let key = LedgerKey::new(user.clone(), device.clone(), op_id.clone());
    let record = LedgerRecord::new(result, recorded_at);
    Ok(storage.ledger_insert(key, record).await?.result)
}
