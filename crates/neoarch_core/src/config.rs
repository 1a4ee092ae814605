//! Runtime configuration loaded from JSON.
//!
//! # Responsibility
//! - Name the logical store database that designs materialize into.
//! - Carry logging settings and the default implied-use toggle.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - `validate` runs on every load path.

use crate::logging::normalize_level;
use crate::model::DesignOptions;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Database name used when none is configured.
pub const DEFAULT_DATABASE: &str = "neo4j";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Target of graph materialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Logical database every session is bound to.
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }
}

/// Logging backend settings. `None` fields fall back to build defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: Option<String>,
    /// Absolute directory for rotated log files; stderr when unset.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub logging: LogConfig,
    /// Default implied-use toggle for designs built by the CLI.
    pub implied_use: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            logging: LogConfig::default(),
            implied_use: true,
        }
    }
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// # Errors
    /// - Blank database name.
    /// - Unknown log level.
    /// - Relative log directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.database.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "store.database cannot be empty".to_string(),
            ));
        }
        if let Some(level) = &self.logging.level {
            normalize_level(level).map_err(ConfigError::Invalid)?;
        }
        if let Some(dir) = &self.logging.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn design_options(&self) -> DesignOptions {
        DesignOptions {
            implied_use: self.implied_use,
        }
    }
}
