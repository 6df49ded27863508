//! Configuration loading and typed config structures for pricebook.
//!
//! Sources are layered with the [`config`](::config) crate, later sources
//! winning:
//!
//! 1. built-in defaults
//! 2. an optional `pricebook.toml` (or `.yaml`) next to the process
//! 3. `PRICEBOOK_*` environment variables, with `__` separating sections
//!    (`PRICEBOOK_HISTORY__RETENTION_DAYS=14`)
//! 4. `DATABASE_URL`, which overrides `database.url`

use std::path::Path;

use ::config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;

use crate::validity::{DEFAULT_RETENTION_DAYS, RetentionWindow};

/// Base name of the optional configuration file.
const CONFIG_FILE_STEM: &str = "pricebook";

/// Prefix of configuration environment variables.
const ENV_PREFIX: &str = "PRICEBOOK";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {source}")]
    Load {
        /// The underlying loader error.
        #[from]
        source: ::config::ConfigError,
    },

    /// A value was read but is not acceptable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    /// History ledger settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// `PostgreSQL` connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl CatalogConfig {
    /// Load configuration from the default file (if present) and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source is malformed or a value is out
    /// of range.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE_STEM).required(false));
        Self::finish(builder)
    }

    /// Load configuration from an explicit file, then the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(File::from(path));
        Self::finish(builder)
    }

    /// Parse configuration from a TOML string, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the string is not valid TOML or a value
    /// is out of range.
    pub fn parse_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// The configured history retention window.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `history.retention_days` is 0.
    pub fn retention_window(&self) -> Result<RetentionWindow, ConfigError> {
        RetentionWindow::from_days(self.history.retention_days).map_err(|e| {
            ConfigError::Invalid {
                reason: format!("history.retention_days: {e}"),
            }
        })
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let mut config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.database.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.retention_window()?;
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                reason: "database.max_connections must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// History ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryConfig {
    /// Days a captured snapshot remains valid.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

/// `PostgreSQL` connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; required by anything that talks to `PostgreSQL`.
    #[serde(default)]
    pub url: Option<String>,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Seconds before an idle connection is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// `DATABASE_URL`, when set, takes precedence over any configured URL.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.url = Some(url);
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

const fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

const fn default_idle_timeout_secs() -> u64 {
    300
}
