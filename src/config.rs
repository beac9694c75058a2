//! config
//!
//! Immutable runtime configuration.
//!
//! # Design
//!
//! Everything the runtime and the authentication service need to know is
//! gathered into one [`RuntimeConfig`] constructed at process start and
//! passed by reference; nothing on the hot path reads ambient global state.
//!
//! # Schema
//!
//! Loaded from TOML:
//!
//! ```toml
//! executable = "/usr/bin/svn"
//! config_dir = "/home/user/.subversion"
//! interactive = true
//! store_credentials = true
//! probe_timeout_ms = 30000
//! ```
//!
//! All fields have defaults; unknown keys are rejected.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML or violates the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is syntactically valid but semantically wrong.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for both backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Path or name of the external executable.
    pub executable: PathBuf,

    /// Persistent credential/config directory. `None` means the platform
    /// default (`~/.subversion`).
    pub config_dir: Option<PathBuf>,

    /// Whether interactive credential prompting is allowed.
    pub interactive: bool,

    /// Whether resolved credentials may be written back into the cache.
    pub store_credentials: bool,

    /// Deadline for bounded calls such as the version probe, in
    /// milliseconds.
    pub probe_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("svn"),
            config_dir: None,
            interactive: true,
            store_credentials: true,
            probe_timeout_ms: 30_000,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, `Parse` if it
    /// is not valid TOML, and `InvalidValue` if validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: RuntimeConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executable.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "executable must not be empty".to_string(),
            ));
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "probe_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Probe deadline as a `Duration`.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// The credential/config directory, resolving the platform default.
    ///
    /// Returns `None` when no explicit directory is configured and no home
    /// directory can be determined.
    pub fn resolved_config_dir(&self) -> Option<PathBuf> {
        self.config_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".subversion")))
    }
}
