//! Unified error type for the sync engine.
//!
//! One enum covers every layer (scope resolution, normalization, version
//! control, storage) so callers match on a single `Error` rather than
//! threading a different error type through each component.

use serde::{Deserialize, Serialize};

/// Stable item-level error codes,
///
/// These are returned verbatim in `PushItemResult::Error { code, .. }` and
/// must not be renamed once clients depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorCode {
    EntityTypeRequired,
    UnsupportedEntityType,
    InvalidOperation,
    EntityIdRequired,
    PayloadMustBeObject,
    WalletIdMismatch,
    EntityIdMismatch,
    InvalidClientId,
    BaseVersionRequired,
    BaseVersionInvalid,
    MissingRequiredFields,
    InvalidFieldType,
    NotFound,
    PayloadTooLarge,
    SensitiveFieldNotAllowed,
    WalletIdMustEqualClientId,
}

impl ItemErrorCode {
    /// Human-readable default message for this code.
    pub fn message(self) -> &'static str {
        match self {
            Self::EntityTypeRequired => "entity_type is required",
            Self::UnsupportedEntityType => "entity_type is not registered",
            Self::InvalidOperation => "operation must be one of create, update, delete",
            Self::EntityIdRequired => "entity_id is required",
            Self::PayloadMustBeObject => "payload must be a JSON object",
            Self::WalletIdMismatch => "payload.wallet_id does not match the request wallet",
            Self::EntityIdMismatch => "payload.client_id does not match entity_id",
            Self::InvalidClientId => "client_id is missing or empty",
            Self::BaseVersionRequired => "base_version is required for update/delete",
            Self::BaseVersionInvalid => "base_version must be a non-negative integer",
            Self::MissingRequiredFields => "one or more required fields are missing",
            Self::InvalidFieldType => "a field does not match its registered type",
            Self::NotFound => "entity does not exist",
            Self::PayloadTooLarge => "payload exceeds the size cap",
            Self::SensitiveFieldNotAllowed => "payload contains a denylisted field",
            Self::WalletIdMustEqualClientId => "wallet_id must equal the wallet entity's client_id",
        }
    }
}

impl std::fmt::Display for ItemErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        write!(f, "{s}")
    }
}

/// Request-level (whole batch rejected) and internal failure modes.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum Error {
    /// Top-level request shape is invalid.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of the malformed field.
        message: String,
    },

    /// Auth/device binding failed.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Reason the token/device binding was rejected.
        message: String,
    },

    /// Caller is not a member of the requested wallet.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Reason access to the wallet was denied.
        message: String,
    },

    /// Malformed pull cursor.
    #[error("invalid cursor: {message}")]
    InvalidCursor {
        /// Description of why the cursor could not be parsed.
        message: String,
    },

    /// Underlying storage backend failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// Configuration failed validation.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid setting.
        message: String,
    },

    /// Item-level validation/application failure.
    #[error("{code}: {message}")]
    Item {
        /// Stable error code.
        code: ItemErrorCode,
        /// Human-readable detail.
        message: String,
    },
}

impl Error {
    /// Build an `InvalidRequest` error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Build an `Unauthorized` error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Build a `Forbidden` error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Build an `InvalidCursor` error.
    pub fn invalid_cursor(message: impl Into<String>) -> Self {
        Self::InvalidCursor {
            message: message.into(),
        }
    }

    /// Build a `Storage` error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Build a `Config` error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Build an item-level error with its stable code's default message.
    pub fn item(code: ItemErrorCode) -> Self {
        Self::Item {
            code,
            message: code.message().to_string(),
        }
    }

    /// Build an item-level error with a custom message.
    pub fn item_detail(code: ItemErrorCode, message: impl Into<String>) -> Self {
        Self::Item {
            code,
            message: message.into(),
        }
    }

    /// Category string, useful as a tracing/metrics field.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::InvalidCursor { .. } => "invalid_cursor",
            Self::Storage { .. } => "storage",
            Self::Config { .. } => "config",
            Self::Item { .. } => "item",
        }
    }
}

/// Standard result type for the sync engine.
pub type Result<T> = std::result::Result<T, Error>;
