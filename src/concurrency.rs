//! Per-attempt mutual exclusion.
//!
//! The same attempt may be driven from concurrent requests (double-submit,
//! multiple tabs). Every state-mutating navigator operation runs inside a
//! short critical section keyed by the attempt identity: acquire, re-load
//! the latest persisted model, apply, persist, release. This registry
//! hands out the per-key locks.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Key identifying one attempt's critical section.
pub fn attempt_key(subject: &str, content_path: &str) -> String {
    format!("{}\u{1f}{}", subject, content_path)
}

/// Registry of per-(subject, content path) locks.
#[derive(Default)]
pub struct AttemptLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AttemptLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for the given key. The same key always yields the same
    /// lock; handles stay valid across the registry's internal mutations.
    pub fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock();
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
