//! TOML configuration for the chassis tracker
//!
//! Every section is optional; a missing file or section falls back to the
//! defaults below.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use compliance_engine::DEFAULT_SOON_THRESHOLD_DAYS;

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "chassis-tracker.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub compliance: ComplianceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// Resolve the configuration for a run.
    ///
    /// An explicit path must exist. Without one, `chassis-tracker.toml` in the
    /// working directory is used if present, otherwise the defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Where the fleet and ledger files live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `fleet.json` and `ledger.json` (default: ./chassis-data)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("chassis-data")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Days before a due date at which it is flagged as due soon (default: 30)
    #[serde(default = "default_soon_threshold")]
    pub soon_threshold_days: i64,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            soon_threshold_days: default_soon_threshold(),
        }
    }
}

fn default_soon_threshold() -> i64 {
    DEFAULT_SOON_THRESHOLD_DAYS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, overridden by `RUST_LOG` (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
