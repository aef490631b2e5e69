//! Configuration for the election engine.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod engine;
mod ledger;
mod storage;

pub use engine::*;
pub use ledger::*;
pub use storage::*;

#[cfg(test)]
mod config_test;

use std::env;
use std::path::Path;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

const ENV_PREFIX: &str = "BALLOT";

/// Main configuration container
///
/// Sources, later overriding earlier:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables with the `BALLOT__` prefix (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BallotConfig {
    /// Lifecycle, timeout and event settings
    #[serde(default)]
    pub engine: EngineConfig,
    /// Sled database settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Ledger ingestion settings
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl BallotConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Validation is deferred so callers can still apply `with_override_config()`.
    /// Callers MUST call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("BALLOT__ENGINE__OPERATION_TIMEOUT_MS", "2000");
    /// let cfg = BallotConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional overrides from file without validation.
    ///
    /// Merging order: current values, then the file, then the latest environment variables.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Consumes self and validates every section.
    pub fn validate(self) -> Result<Self> {
        self.engine.validate()?;
        self.storage.validate()?;
        self.ledger.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

pub(super) fn invalid(message: String) -> Error {
    Error::Config(ConfigError::Message(message))
}

/// Ensures `path` names a directory the process can create and write into.
pub(super) fn validate_directory(
    path: &Path,
    name: &str,
) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(invalid(format!("{name} path cannot be empty")));
    }

    #[cfg(not(test))]
    {
        use std::fs;
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| {
                invalid(format!(
                    "Failed to create {} directory at {}: {}",
                    name,
                    path.display(),
                    e
                ))
            })?;
        }

        let test_file = path.join(".permission_test");
        fs::write(&test_file, b"test").map_err(|e| {
            invalid(format!(
                "No write permission in {} directory {}: {}",
                name,
                path.display(),
                e
            ))
        })?;
        fs::remove_file(&test_file).ok();
    }

    Ok(())
}
