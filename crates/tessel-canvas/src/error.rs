use tessel_crypto::CanonicalError;

/// Errors from encoding materialized state.
///
/// Folding events never fails; conflicts are reported as
/// [`CanvasWarning`](crate::CanvasWarning) values instead.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<CanonicalError> for CanvasError {
    fn from(e: CanonicalError) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type CanvasResult<T> = Result<T, CanvasError>;
