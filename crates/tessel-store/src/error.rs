use tessel_types::ObjectHash;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No object is stored under this address. Distinct from corruption.
    #[error("object not found: {0}")]
    NotFound(ObjectHash),

    /// Stored bytes no longer hash to their address (data corruption).
    #[error("hash mismatch for {expected}: stored bytes hash to {computed}")]
    HashMismatch {
        expected: ObjectHash,
        computed: ObjectHash,
    },

    /// I/O error from the underlying storage backend.
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
