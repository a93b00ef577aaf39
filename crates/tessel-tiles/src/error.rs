use std::io;

use tessel_crypto::CanonicalError;
use tessel_store::StoreError;
use tessel_types::{ObjectHash, SpaceId, TileId};
use tessel_validate::ValidationError;

/// Errors produced by the tile store and its runtime.
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    /// The batch was rejected before any I/O. Nothing was buffered.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Object store failure, including `NotFound` for absent objects.
    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error on manifest, index, or snapshot files.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The tile has no index yet.
    #[error("tile not found: {space}/{tile}")]
    TileNotFound { space: SpaceId, tile: TileId },

    /// A segment's bytes do not decode into events.
    #[error("corrupt segment {hash}: {reason}")]
    CorruptSegment { hash: ObjectHash, reason: String },

    /// Configuration could not be parsed.
    #[error("invalid tile store config: {0}")]
    Config(#[from] toml::de::Error),

    /// The runtime has been shut down and cannot accept events.
    #[error("tile runtime is shut down")]
    Shutdown,

    /// A blocking flush task panicked or was cancelled.
    #[error("flush task failed: {0}")]
    Task(String),
}

impl TileError {
    /// Returns `true` when the error means "does not exist yet" rather than
    /// a failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::TileNotFound { .. } => true,
            Self::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for TileError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<CanonicalError> for TileError {
    fn from(e: CanonicalError) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience alias used throughout the tiles crate.
pub type TileResult<T> = Result<T, TileError>;
