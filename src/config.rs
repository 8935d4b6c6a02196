//! Configuration file
//!
//! A JSON object; every field is optional:
//!
//! ```json
//! {
//!   "data_dir": "./data",
//!   "lock_timeout_ms": 5000,
//!   "default_page_size": 20,
//!   "max_page_size": 1000,
//!   "fsync": true,
//!   "log_level": "info"
//! }
//! ```
//!
//! Without `data_dir` the store is in-memory only.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        "PALIMPSEST_CONFIG_INVALID"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Journal directory; absent means nothing is persisted
    #[serde(default)]
    pub data_dir: Option<String>,

    /// How long a writer waits for an entity lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// fsync after every journal append
    #[serde(default = "default_fsync")]
    pub fsync: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_lock_timeout_ms() -> u64 {
    5000
}
fn default_page_size() -> usize {
    20
}
fn default_max_page_size() -> usize {
    1000
}
fn default_fsync() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            lock_timeout_ms: default_lock_timeout_ms(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            fsync: default_fsync(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// In-memory configuration with defaults.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Durable configuration rooted at `data_dir`.
    pub fn durable(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: Some(data_dir.as_ref().display().to_string()),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid("lock_timeout_ms must be > 0".into()));
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid("default_page_size must be > 0".into()));
        }
        if self.max_page_size < self.default_page_size {
            return Err(ConfigError::Invalid(format!(
                "max_page_size ({}) must be >= default_page_size ({})",
                self.max_page_size, self.default_page_size
            )));
        }
        if let Some(dir) = &self.data_dir {
            if dir.trim().is_empty() {
                return Err(ConfigError::Invalid("data_dir must not be empty".into()));
            }
        }
        self.severity()?;
        Ok(())
    }

    pub fn data_path(&self) -> Option<&Path> {
        self.data_dir.as_deref().map(Path::new)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn severity(&self) -> Result<Severity, ConfigError> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }
}
