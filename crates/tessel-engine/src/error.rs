use tessel_canvas::CanvasError;
use tessel_tiles::TileError;
use tessel_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Tiles(#[from] TileError),

    #[error("materialization error: {0}")]
    Canvas(#[from] CanvasError),

    #[error("invalid object address: {0}")]
    InvalidAddress(#[from] TypeError),

    #[error("invalid engine config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Absent tile or object, as opposed to a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Tiles(e) if e.is_not_found())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
