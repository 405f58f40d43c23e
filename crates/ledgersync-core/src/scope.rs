//! The `Scope` record threaded through every sync layer.
//!
//! Every layer takes an explicit `Scope` value rather than reaching into
//! ambient request-local state. No global session state lives anywhere in
//! this workspace.

use crate::identifiers::{DeviceId, UserId, WalletId};
use serde::{Deserialize, Serialize};

/// A member's role within a wallet, as resolved by `WalletAcl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full read/write access.
    Owner,
    /// Read/write access but cannot manage membership.
    Member,
    /// Read-only access; pushes are rejected at the orchestrator.
    Viewer,
}

impl Role {
    /// Whether this role may submit mutations via `push`.
    pub fn can_mutate(self) -> bool {
        !matches!(self, Self::Viewer)
    }
}

/// The resolved identity/authorization context for a single request.
///
/// Produced by the Identity & Scope Resolver and consumed by
/// every later stage; nothing downstream re-derives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Resolved user identity.
    pub user: UserId,
    /// Device bound to the bearer token.
    pub device: DeviceId,
    /// Wallet the request is scoped to.
    pub wallet: WalletId,
    /// The user's role within `wallet`.
    pub role: Role,
}

impl Scope {
    /// Build a new scope record.
    pub fn new(user: UserId, device: DeviceId, wallet: WalletId, role: Role) -> Self {
        Self { user, device, wallet, role }
    }
}
