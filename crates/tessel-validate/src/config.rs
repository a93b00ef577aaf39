use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the event validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Run the source/derived boundary pass after structural validation.
    pub enforce_boundary: bool,
    /// Reject operations that are neither known nor in the `macro.*`
    /// namespace. Off by default: unknown operations are logged and accepted.
    pub reject_unknown_operations: bool,
    /// Maximum number of events accepted in one append batch.
    pub max_batch_size: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            enforce_boundary: true,
            reject_unknown_operations: false,
            max_batch_size: 1000,
        }
    }
}

impl ValidatorConfig {
    /// Parse from TOML; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}
