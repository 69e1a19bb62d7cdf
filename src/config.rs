//! Random subsystem configuration.
//!
//! Only policy lives here. Nothing in the config can weaken the entropy
//! path: OS entropy is always drawn, the hardware RNG can only be added on
//! top of it.

use crate::entropy::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of output bytes a DRBG may emit before it must reseed.
pub const DEFAULT_RESEED_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024;

/// Configuration for the DRBG pair of every thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    /// Output bytes per reseed period.
    pub reseed_threshold_bytes: u64,
    /// Mix RDRAND output into seeds when the CPU supports it.
    pub mix_hardware_entropy: bool,
    /// Hash used to condition raw entropy into seeds.
    pub conditioning: HashAlgorithm,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            reseed_threshold_bytes: DEFAULT_RESEED_THRESHOLD_BYTES,
            mix_hardware_entropy: true,
            conditioning: HashAlgorithm::Blake3,
        }
    }
}

impl RandomConfig {
    /// Creates a configuration with a custom reseed threshold.
    pub fn with_reseed_threshold(reseed_threshold_bytes: u64) -> Self {
        Self {
            reseed_threshold_bytes,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reseed_threshold_bytes == 0 {
            return Err(ConfigError::InvalidReseedThreshold);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The reseed threshold was zero.
    #[error("reseed threshold must be greater than zero")]
    InvalidReseedThreshold,
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[random]` table.
    #[serde(default)]
    pub random: RandomConfig,
    /// `[log]` table.
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.random.validate()?;
        Ok(config)
    }
}
