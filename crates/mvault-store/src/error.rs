use std::path::PathBuf;

use mvault_types::TypeError;

/// Errors from manifest store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The name is missing its namespace, repository, or tag.
    #[error("name is not fully qualified: {0:?}")]
    Unqualified(String),

    /// A path below the store root does not map to a valid name.
    #[error("invalid name at {path}: {reason}")]
    InvalidName { path: PathBuf, reason: String },

    /// No manifest or blob at the resolved location.
    #[error("not found: {0}")]
    NotFound(String),

    /// The manifest file exists but does not decode.
    #[error("corrupt manifest {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Attempted to mutate a synthetic manifest.
    #[error("manifest {0} is synthetic and cannot be modified")]
    Protected(String),

    /// A layer carries a digest that cannot locate a blob.
    #[error("invalid layer digest: {0}")]
    InvalidDigest(#[from] TypeError),

    /// Serialization failure while writing.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The operation was cancelled or ran past its deadline.
    #[error("operation cancelled")]
    Cancelled,

    /// The store configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
