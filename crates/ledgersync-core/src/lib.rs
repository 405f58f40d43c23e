//! Shared types for the wallet sync engine.
//!
//! This crate has no I/O and no async runtime dependency beyond the trait
//! signatures in [`collaborators`] — it is the vocabulary every other crate
//! in this workspace (`ledgersync-store`, `ledgersync-engine`) speaks.

pub mod collaborators;
pub mod config;
pub mod cursor;
pub mod entity;
pub mod errors;
pub mod identifiers;
pub mod registry;
pub mod scope;
pub mod wire;

pub use collaborators::{AuthResolver, Clock, WalletAcl};
pub use config::EngineConfig;
pub use cursor::Cursor;
pub use entity::{Entity, Payload};
pub use errors::{Error, ItemErrorCode, Result};
pub use identifiers::{DeviceId, EntityId, EntityType, LedgerKey, OpId, RowKey, UserId, WalletId};
pub use registry::{AcceptedMutation, EntityDescriptor, EntityRegistry, FieldType, RecalcHook, RecalcKind, RecalcTask};
pub use scope::{Role, Scope};
pub use wire::{OperationKind, PullItem, PullResponse, PushItem, PushItemResult, PushResponse};
