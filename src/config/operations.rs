//! Config loading, validation, and utility operations.

use super::model::LockerConfig;
use crate::error::{KeylockError, Result};
use std::path::Path;

impl LockerConfig {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(LockerConfig)` - Successfully loaded and validated config
    /// * `Err(KeylockError::ConfigError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            KeylockError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: LockerConfig = serde_yaml::from_str(yaml)
            .map_err(|e| KeylockError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            KeylockError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `retry_interval_ms` must be positive
    /// - `acquire_timeout_ms` must be positive
    pub fn validate(&self) -> Result<()> {
        if self.retry_interval_ms == 0 {
            return Err(KeylockError::ConfigError(
                "retry_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.acquire_timeout_ms == 0 {
            return Err(KeylockError::ConfigError(
                "acquire_timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
