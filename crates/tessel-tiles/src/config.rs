use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessel_types::HashAlgorithm;
use tessel_validate::ValidatorConfig;

use crate::error::TileResult;

/// Configuration for the tile store and its flush runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileStoreConfig {
    /// Flush a tile's buffer once it holds at least this many encoded bytes.
    pub flush_threshold_bytes: usize,
    /// Flush a non-empty buffer untouched for this long.
    pub flush_interval_ms: u64,
    /// How often the timer task checks every buffer.
    pub scan_interval_ms: u64,
    /// Address algorithm for new segments and snapshots.
    pub hash_algorithm: HashAlgorithm,
    pub validator: ValidatorConfig,
}

impl Default for TileStoreConfig {
    fn default() -> Self {
        Self {
            flush_threshold_bytes: 64 * 1024,
            flush_interval_ms: 5_000,
            scan_interval_ms: 1_000,
            hash_algorithm: HashAlgorithm::Sha256,
            validator: ValidatorConfig::default(),
        }
    }
}

impl TileStoreConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Never zero; `tokio::time::interval` panics on a zero period.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(1))
    }

    /// Parse from TOML; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> TileResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> TileResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
