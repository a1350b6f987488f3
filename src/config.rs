//! Configuration System
//!
//! File- and environment-driven configuration for embedding hosts: where
//! definition bundles live, where packed bundles are extracted, where the
//! snapshot database sits, and how logging behaves.

use crate::error::EngineError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory of the definition content store
    #[serde(default = "default_content_root")]
    pub content_root: PathBuf,

    /// Scratch directory for one-time bundle extraction
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Path of the snapshot database
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_content_root() -> PathBuf {
    PathBuf::from("content")
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("scratch")
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("snapshots")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_root: default_content_root(),
            scratch_dir: default_scratch_dir(),
            snapshot_path: default_snapshot_path(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration with file + environment layering.
    ///
    /// Environment variables use the `INVIGIL` prefix with `__` as the
    /// nesting separator (e.g. `INVIGIL__CONTENT_ROOT`,
    /// `INVIGIL__LOGGING__LEVEL`) and override file values.
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("INVIGIL")
                .prefix_separator("__")
                .separator("__"),
        );
        let loaded: EngineConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.content_root.as_os_str().is_empty() {
            return Err(EngineError::Config(
                "Content root cannot be empty".to_string(),
            ));
        }
        if self.scratch_dir.as_os_str().is_empty() {
            return Err(EngineError::Config(
                "Scratch directory cannot be empty".to_string(),
            ));
        }
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(EngineError::Config(
                "Snapshot path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
