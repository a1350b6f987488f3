//! Error types for the assessment delivery engine.
//!
//! Recoverable business outcomes (timing windows, exhausted attempts,
//! partial section submissions) are NOT errors; they travel as codes on
//! [`crate::info::Info`]. The enums here cover storage faults, definition
//! resolution faults, and protocol violations by the caller.

use crate::types::ItemIdent;
use std::path::PathBuf;
use thiserror::Error;

/// Snapshot-store errors. Save failures are surfaced to the caller since a
/// lost submission is a correctness violation; load failures are degraded
/// to "no prior attempt" inside the store implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open snapshot store: {0}")]
    Open(String),

    #[error("Failed to encode snapshot for {key}: {reason}")]
    Encode { key: String, reason: String },

    #[error("Failed to write snapshot for {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Definition-resolution errors. Absent fragments are `Ok(None)`, not
/// errors; these cover broken bundles and unpack failures.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid definition bundle at {path:?}: {reason}")]
    InvalidBundle { path: PathBuf, reason: String },

    #[error("Failed to unpack bundle {reference}: {reason}")]
    UnpackFailed { reference: String, reason: String },

    #[error("Duplicate item identifier '{item}' in section '{section}'")]
    DuplicateItem { section: String, item: ItemIdent },

    #[error("Resolver I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Protocol violations and infrastructure faults raised by navigator
/// operations. Every variant except `Storage` and `Config` indicates the
/// caller broke the driving protocol and must not be silently tolerated.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Operation '{operation}' requires a running assessment (status: {status})")]
    NotRunning {
        operation: &'static str,
        status: String,
    },

    #[error("Assessment was already started")]
    AlreadyStarted,

    #[error("Submission contained no responses")]
    EmptySubmission,

    #[error("Response identifier '{got}' does not match current item '{expected}'")]
    IdentifierMismatch { expected: ItemIdent, got: ItemIdent },

    #[error("Response targets unknown item '{0}' in the current section")]
    UnknownItem(ItemIdent),

    #[error("Section index {index} out of range ({count} sections)")]
    SectionOutOfRange { index: usize, count: usize },

    #[error("Item index {item} out of range in section {section}")]
    ItemOutOfRange { section: usize, item: usize },

    #[error("No current section: assessment position is already past the end")]
    NoCurrentSection,

    #[error("No current item: section position is already past the end")]
    NoCurrentItem,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}
