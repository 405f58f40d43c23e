//! Identity & Scope Resolver: binds a request to
//! `(user, device, wallet)` and enforces wallet membership before any
//! other stage runs.
//!
//! This is the one function that talks to both external collaborators
//! (`AuthResolver`, `WalletAcl`) in a single call — every later stage
//! (ledger, normalizer, version controller, recalc, push/pull
//! orchestrators) takes the resulting [`Scope`] as a plain value and never
//! re-derives it.

use ledgersync_core::{AuthResolver, DeviceId, Error, Result, Scope, WalletAcl, WalletId};

/// Resolve `(bearer_token, device_id, wallet_id)` into a [`Scope`].
///
/// Fails with `Error::Unauthorized` if the token is unknown, revoked,
/// expired, or bound to a different device than `device_id`;
/// fails with `Error::Forbidden` if the resolved user is not a member of
/// `wallet_id`.
pub async fn resolve_scope(
    auth: &dyn AuthResolver,
    acl: &dyn WalletAcl,
    token: &str,
    device_id: &DeviceId,
    wallet_id: &WalletId,
) -> Result<Scope> {
    let user = auth.resolve(token, device_id).await?;
    let role = acl.role_of(&user, wallet_id).await.map_err(|err| match err {
        Error::Forbidden { .. } => err,
        other => Error::forbidden(other.to_string()),
    })?;
    Ok(Scope::new(user, device_id.clone(), wallet_id.clone(), role))
}
