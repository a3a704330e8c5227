//! Pipeline configuration
//!
//! Loaded from TOML. Every section is optional and falls back to defaults:
//!
//! ```toml
//! [data_service]
//! protocol = "http"
//! host = "service.iris.edu"
//! path = "/fdsnws/dataselect/1/query"
//!
//! [psd]
//! min_samples = 32
//! max_period_s = 1e6
//! window = "cosine-taper"
//!
//! [pipeline]
//! worker_threads = 0
//! ```

use crate::spectrum::{WindowType, MIN_SAMPLES};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Location of the time-series data service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataServiceConfig {
    pub protocol: String,
    pub host: String,
    pub path: String,
}

impl Default for DataServiceConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "service.iris.edu".to_string(),
            path: "/fdsnws/dataselect/1/query".to_string(),
        }
    }
}

/// PSD estimation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsdConfig {
    /// Fewest samples a trace may have in the requested range
    pub min_samples: usize,

    /// Bins at or beyond this period (seconds) are left out of the plot
    pub max_period_s: f64,

    /// Taper applied to each averaging window
    pub window: WindowType,
}

impl Default for PsdConfig {
    fn default() -> Self {
        Self {
            min_samples: MIN_SAMPLES,
            max_period_s: 1e6,
            window: WindowType::CosineTaper,
        }
    }
}

/// Scheduling of the PSD stage
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Worker threads for the PSD fan-out, 0 = one per core
    pub worker_threads: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_service: DataServiceConfig,
    pub psd: PsdConfig,
    pub pipeline: ExecutionConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load, logging and falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Using default configuration ({:?}): {}", path, e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.psd.min_samples < MIN_SAMPLES {
            return Err(ConfigError::Invalid(format!(
                "psd.min_samples must be at least {}, got {}",
                MIN_SAMPLES, self.psd.min_samples
            )));
        }
        if self.psd.max_period_s.is_nan() || self.psd.max_period_s <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "psd.max_period_s must be positive, got {}",
                self.psd.max_period_s
            )));
        }
        if self.data_service.host.trim().is_empty() {
            return Err(ConfigError::Invalid("data_service.host is empty".into()));
        }
        Ok(())
    }
}
