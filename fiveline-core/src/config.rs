//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) is valid.
//! Command-line flags override what is loaded here.

use crate::data::{Adjustment, DEFAULT_PADDING_DAYS};
use crate::display::DEFAULT_LOOKBACK;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which history provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub provider: ProviderKind,
    pub csv_path: Option<PathBuf>,
    pub adjustment: Adjustment,
    pub padding_days: u32,
    pub cache_dir: PathBuf,
    pub cache_ttl_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Yahoo,
            csv_path: None,
            adjustment: Adjustment::Forward,
            padding_days: DEFAULT_PADDING_DAYS,
            cache_dir: default_cache_dir(),
            cache_ttl_secs: 3600,
        }
    }
}

impl DataConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub lookback: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FivelineConfig {
    pub data: DataConfig,
    pub display: DisplayConfig,
}

impl FivelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.lookback == 0 {
            return Err(ConfigError::Invalid("display.lookback must be positive".into()));
        }
        if self.data.provider == ProviderKind::Csv && self.data.csv_path.is_none() {
            return Err(ConfigError::Invalid(
                "data.csv_path is required when data.provider = \"csv\"".into(),
            ));
        }
        Ok(())
    }
}

/// Platform cache directory plus `fiveline`, or `./.fiveline-cache`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("fiveline"))
        .unwrap_or_else(|| PathBuf::from(".fiveline-cache"))
}
