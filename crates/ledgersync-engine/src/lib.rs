//! Wallet sync engine: normalization, optimistic version control, conflict
//! reporting, recalc dispatch, and the push/pull orchestrators.
//!
//! This crate has no transport, no auth implementation, and no storage
//! backend of its own — it composes `ledgersync-core`'s types and traits
//! over whatever [`ledgersync_store::Storage`] the caller supplies, treating
//! auth and the storage backend as external collaborators reached only
//! through trait objects.

pub mod cursor_indexer;
pub mod ledger;
pub mod normalizer;
pub mod pull;
pub mod push;
pub mod recalc;
pub mod registry_defs;
pub mod scope_resolver;
pub mod version_controller;

pub use cursor_indexer::MonotonicClock;
pub use pull::pull;
pub use push::push;
pub use scope_resolver::resolve_scope;
