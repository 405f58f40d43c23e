//! Storage-layer error type, separate from [`ledgersync_core::Error`] so a
//! storage backend can be swapped without the engine's error enum growing
//! backend-specific variants.

use thiserror::Error;

/// Failure modes a [`crate::Storage`] implementation may report.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend's read path failed.
    #[error("read failed: {0}")]
    ReadFailed(String),
    /// The backend's write path failed.
    #[error("write failed: {0}")]
    WriteFailed(String),
    /// The backend's delete path failed.
    #[error("delete failed: {0}")]
    DeleteFailed(String),
}

impl From<StorageError> for ledgersync_core::Error {
    fn from(err: StorageError) -> Self {
        ledgersync_core::Error::storage(err.to_string())
    }
}
