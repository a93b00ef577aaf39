use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("malformed object address: {0}")]
    MalformedAddress(String),

    #[error("invalid payload for operation '{operation}': {reason}")]
    InvalidPayload { operation: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
