//! Runtime Snapshot Store.
//!
//! Persists the mutable runtime model of one attempt, keyed by (subject,
//! content path), so an attempt survives independent stateless requests.
//! Load failures of any kind degrade to "no prior attempt"; save failures
//! propagate, since losing a submission is a correctness violation.

use crate::context::AssessmentContext;
use crate::error::StorageError;
use std::path::Path;
use tracing::warn;

/// Contract for saving/loading one attempt's runtime model.
pub trait SnapshotStore: Send + Sync {
    /// Durably write the runtime model under its (subject, content path)
    /// key, replacing any previous snapshot.
    fn save(&self, snapshot: &AssessmentContext) -> Result<(), StorageError>;

    /// Load a previously saved model, or `None` if no snapshot exists or
    /// the stored bytes cannot be decoded (degrade to fresh start).
    fn load(
        &self,
        subject: &str,
        content_path: &str,
    ) -> Result<Option<AssessmentContext>, StorageError>;

    /// Remove a snapshot. Missing keys are not an error.
    fn delete(&self, subject: &str, content_path: &str) -> Result<(), StorageError>;
}

/// Key layout inside the sled tree. The content path may contain any
/// character, so the subject is length-prefixed rather than delimited.
fn snapshot_key(subject: &str, content_path: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(10 + subject.len() + content_path.len());
    key.extend_from_slice(b"attempt:");
    key.extend_from_slice(&(subject.len() as u32).to_le_bytes());
    key.extend_from_slice(subject.as_bytes());
    key.extend_from_slice(content_path.as_bytes());
    key
}

/// Sled-backed implementation of [`SnapshotStore`].
pub struct SledSnapshotStore {
    db: sled::Db,
}

impl SledSnapshotStore {
    /// Open (or create) the snapshot database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)
            .map_err(|e| StorageError::Open(format!("Failed to open sled database: {}", e)))?;
        Ok(Self { db })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to flush database: {}", e),
            ))
        })?;
        Ok(())
    }
}

impl SnapshotStore for SledSnapshotStore {
    fn save(&self, snapshot: &AssessmentContext) -> Result<(), StorageError> {
        let key = snapshot_key(&snapshot.subject, &snapshot.content_path);
        let key_display = format!("{}:{}", snapshot.subject, snapshot.content_path);
        // JSON rather than bincode: recorded responses are arbitrary
        // serde_json::Value trees, which only a self-describing format can
        // round-trip.
        let value = serde_json::to_vec(snapshot).map_err(|e| StorageError::Encode {
            key: key_display.clone(),
            reason: e.to_string(),
        })?;

        self.db.insert(key, value).map_err(|e| StorageError::Write {
            key: key_display.clone(),
            reason: e.to_string(),
        })?;
        // A snapshot is the durable record of a submission; make it so
        // before reporting success.
        self.db.flush().map_err(|e| StorageError::Write {
            key: key_display,
            reason: format!("flush failed: {}", e),
        })?;
        Ok(())
    }

    fn load(
        &self,
        subject: &str,
        content_path: &str,
    ) -> Result<Option<AssessmentContext>, StorageError> {
        let key = snapshot_key(subject, content_path);
        let value = match self.db.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(
                    subject = subject,
                    content_path = content_path,
                    error = %e,
                    "Snapshot read failed; treating as no prior attempt"
                );
                return Ok(None);
            }
        };
        match serde_json::from_slice::<AssessmentContext>(&value) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(
                    subject = subject,
                    content_path = content_path,
                    error = %e,
                    "Discarding undecodable snapshot; treating as no prior attempt"
                );
                Ok(None)
            }
        }
    }

    fn delete(&self, subject: &str, content_path: &str) -> Result<(), StorageError> {
        let key = snapshot_key(subject, content_path);
        self.db.remove(key).map_err(|e| StorageError::Write {
            key: format!("{}:{}", subject, content_path),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
