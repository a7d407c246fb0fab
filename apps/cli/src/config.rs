//! CLI configuration file support.
//!
//! Configuration precedence, lowest first:
//! 1. Defaults
//! 2. Global config file (~/.kvk/config.toml)
//! 3. Local config file (./.kvkrc)
//! 4. File given with `--config`
//! 5. Environment variables (`KVK_PREFIX`, `KVK_WORKERS`, `KVK_LOG_LEVEL`)
//! 6. CLI arguments (applied by the caller)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix a line must start with to be treated as a command.
pub const DEFAULT_PREFIX: &str = "-";

/// Number of lines processed concurrently.
pub const DEFAULT_WORKERS: usize = 4;

/// Requester name used when none is configured.
pub const DEFAULT_REQUESTER: &str = "console";

/// CLI configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Command prefix
    #[serde(default)]
    pub prefix: Option<String>,

    /// Size of the worker pool
    #[serde(default)]
    pub workers: Option<usize>,

    /// Log level or filter directive
    #[serde(default)]
    pub log_level: Option<String>,

    /// Identity commands run as
    #[serde(default)]
    pub requester: RequesterConfig,
}

/// Identity of the console requester.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterConfig {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Permissions held
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum CliConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type CliConfigResult<T> = std::result::Result<T, CliConfigError>;

impl CliConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> CliConfigResult<Self> {
        if !path.exists() {
            return Err(CliConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CliConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| CliConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".kvk").join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".kvkrc")
    }

    /// Discover and load configuration files.
    ///
    /// Missing global and local files are skipped; a missing or malformed
    /// `explicit` file is an error, as is a malformed discovered one.
    pub fn discover_and_load(explicit: Option<&Path>) -> CliConfigResult<Self> {
        let mut config = Self::default();

        for path in [Self::default_global_path(), Self::default_local_path()] {
            match Self::load_from_file(&path) {
                Ok(found) => config.merge(&found),
                Err(CliConfigError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        if let Some(path) = explicit {
            config.merge(&Self::load_from_file(path)?);
        }

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` if they are Some.
    /// Permissions accumulate.
    pub fn merge(&mut self, other: &Self) {
        if let Some(ref prefix) = other.prefix {
            self.prefix = Some(prefix.clone());
        }
        if let Some(workers) = other.workers {
            self.workers = Some(workers);
        }
        if let Some(ref log_level) = other.log_level {
            self.log_level = Some(log_level.clone());
        }
        if let Some(ref name) = other.requester.name {
            self.requester.name = Some(name.clone());
        }
        for permission in &other.requester.permissions {
            if !self.requester.permissions.contains(permission) {
                self.requester.permissions.push(permission.clone());
            }
        }
    }

    /// Overrides values from the environment, read through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> CliConfigResult<()> {
        if let Some(prefix) = var("KVK_PREFIX") {
            self.prefix = Some(prefix);
        }
        if let Some(workers) = var("KVK_WORKERS") {
            let workers = workers
                .trim()
                .parse()
                .map_err(|_| CliConfigError::InvalidValue(format!("KVK_WORKERS must be a number, got '{workers}'")))?;
            self.workers = Some(workers);
        }
        if let Some(log_level) = var("KVK_LOG_LEVEL") {
            self.log_level = Some(log_level);
        }
        Ok(())
    }

    /// Rejects values the CLI cannot run with.
    pub fn validate(&self) -> CliConfigResult<()> {
        if self.workers == Some(0) {
            return Err(CliConfigError::InvalidValue("workers must be at least 1".to_string()));
        }
        if self.prefix.as_deref().is_some_and(|prefix| prefix.chars().any(char::is_whitespace)) {
            return Err(CliConfigError::InvalidValue("prefix must not contain whitespace".to_string()));
        }
        Ok(())
    }

    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }

    pub fn workers(&self) -> usize {
        self.workers.unwrap_or(DEFAULT_WORKERS)
    }

    pub fn requester_name(&self) -> &str {
        self.requester.name.as_deref().unwrap_or(DEFAULT_REQUESTER)
    }
}
