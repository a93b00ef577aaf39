use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tessel_tiles::TileStoreConfig;

use crate::error::EngineResult;

/// Top-level engine configuration, usually loaded from `tessel.toml`.
///
/// ```toml
/// data_dir = "/var/lib/tessel"
///
/// [tiles]
/// flush_threshold_bytes = 65536
/// flush_interval_ms = 5000
///
/// [tiles.validator]
/// reject_unknown_operations = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root of `objects/` and `spaces/`. Ignored when `in_memory` is set.
    pub data_dir: PathBuf,
    pub tiles: TileStoreConfig,
    pub in_memory: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("tessel-data"),
            tiles: TileStoreConfig::default(),
            in_memory: false,
        }
    }
}

impl EngineConfig {
    /// Default settings with nothing written to disk.
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
