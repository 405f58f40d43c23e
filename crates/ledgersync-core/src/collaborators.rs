//! Trait boundaries for the systems this crate treats as external
//! collaborators: authentication, wallet membership, and the
//! monotonic clock. None of these are implemented here beyond what the
//! sync engine itself needs to call through them — token issuance, ACL
//! management, and real wall-clock sourcing live outside this workspace.

use crate::errors::Result;
use crate::identifiers::{DeviceId, UserId, WalletId};
use crate::scope::Role;
use async_trait::async_trait;

/// Resolves a bearer token (and its bound device) to a user identity.
#[async_trait]
pub trait AuthResolver: Send + Sync {
    /// Resolve `token`, verifying it is bound to `device_id`.
    ///
    /// Returns `Error::Unauthorized` if the token is unknown, revoked,
    /// expired, or bound to a different device.
    async fn resolve(&self, token: &str, device_id: &DeviceId) -> Result<UserId>;
}

/// Wallet membership/authority check.
#[async_trait]
pub trait WalletAcl: Send + Sync {
    /// Return the caller's role in `wallet`, or `Error::Forbidden` if they
    /// are not a member.
    async fn role_of(&self, user: &UserId, wallet: &WalletId) -> Result<Role>;
}

/// Per-wallet monotonic timestamp allocator.
///
/// Implementations must guarantee `now(wallet)` is strictly greater than
/// every previous call for the same wallet, even under concurrent callers.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Allocate the next strictly-monotonic timestamp for `wallet`.
    async fn now(&self, wallet: &WalletId) -> chrono::DateTime<chrono::Utc>;
}
