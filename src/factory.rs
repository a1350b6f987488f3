//! Assessment Factory.
//!
//! Entry point for the request layer: either resumes a previously
//! persisted, unfinished attempt for a subject, or constructs a fresh
//! attempt from a resolved definition, handing back a ready-to-drive
//! [`AssessmentInstance`]. Concurrent calls for the same (subject, content
//! path) serialize on the attempt lock so two resumed instances cannot
//! diverge.

use crate::concurrency::{attempt_key, AttemptLocks};
use crate::context::AssessmentContext;
use crate::error::EngineError;
use crate::eval::Evaluator;
use crate::info::AttemptStatus;
use crate::navigator::AssessmentInstance;
use crate::resolver::DefinitionResolver;
use crate::snapshot::SnapshotStore;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct AssessmentFactory {
    resolver: Arc<dyn DefinitionResolver>,
    store: Arc<dyn SnapshotStore>,
    evaluator: Arc<dyn Evaluator>,
    locks: Arc<AttemptLocks>,
}

impl AssessmentFactory {
    pub fn new(
        resolver: Arc<dyn DefinitionResolver>,
        store: Arc<dyn SnapshotStore>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        AssessmentFactory {
            resolver,
            store,
            evaluator,
            locks: Arc::new(AttemptLocks::new()),
        }
    }

    /// Resume an unfinished attempt or create a fresh one.
    ///
    /// Returns `Ok(None)` when the definition reference does not resolve;
    /// the caller treats that as a configuration/availability error, not a
    /// crash. With `preview` set, persisted attempts are ignored and a
    /// throwaway fresh model is handed out.
    pub fn create_or_resume(
        &self,
        subject: &str,
        definition_ref: &str,
        preview: bool,
        content_path: &str,
    ) -> Result<Option<AssessmentInstance>, EngineError> {
        let def = match self.resolver.assessment(definition_ref) {
            Ok(Some(def)) => def,
            Ok(None) => {
                warn!(
                    definition_ref = definition_ref,
                    "Definition reference did not resolve; no instance created"
                );
                return Ok(None);
            }
            Err(e) => {
                warn!(
                    definition_ref = definition_ref,
                    error = %e,
                    "Definition resolution failed; no instance created"
                );
                return Ok(None);
            }
        };

        let lock = self.locks.lock_for(&attempt_key(subject, content_path));
        let _guard = lock.lock();

        if !preview {
            let mut snapshot = self.store.load(subject, content_path)?;
            if snapshot.is_none() {
                // Deprecated fallback: attempts created under the older,
                // shorter key scheme are probed read-only and migrated to
                // the current key on their next save.
                if let Some(legacy_key) = legacy_content_key(content_path) {
                    if let Some(mut old) = self.store.load(subject, &legacy_key)? {
                        info!(
                            subject = subject,
                            content_path = content_path,
                            legacy_key = %legacy_key,
                            "Found attempt under legacy snapshot key; migrating"
                        );
                        old.content_path = content_path.to_string();
                        snapshot = Some(old);
                    }
                }
            }
            if let Some(context) = snapshot {
                if !context.status.is_terminal() {
                    info!(
                        attempt_id = %context.attempt_id,
                        subject = subject,
                        "Resuming persisted attempt"
                    );
                    // An adopted attempt that was claimed but never started
                    // still needs start_assessment from its caller.
                    let resuming = context.status == AttemptStatus::Running;
                    // The snapshot carries only state; collaborators are
                    // rebound fresh here.
                    return Ok(Some(AssessmentInstance::new(
                        def,
                        context,
                        Arc::clone(&self.store),
                        Arc::clone(&self.evaluator),
                        Arc::clone(&self.locks),
                        resuming,
                        false,
                    )));
                }
            }
        }

        let attempt_id = Uuid::new_v4();
        let context = AssessmentContext::new(attempt_id, subject, content_path, &def);
        if !preview {
            // Claim the key while still inside the critical section, so a
            // concurrent create resumes this attempt instead of minting a
            // second live one for the same (subject, content path).
            self.store.save(&context)?;
        }
        info!(
            attempt_id = %attempt_id,
            subject = subject,
            assessment = %def.ident,
            preview = preview,
            "Created fresh attempt"
        );
        Ok(Some(AssessmentInstance::new(
            def,
            context,
            Arc::clone(&self.store),
            Arc::clone(&self.evaluator),
            Arc::clone(&self.locks),
            false,
            preview,
        )))
    }
}

/// Key an attempt would have carried under the old scheme: the final path
/// component alone. `None` when it is identical to the current key.
fn legacy_content_key(content_path: &str) -> Option<String> {
    let short = content_path.rsplit('/').next()?;
    if short == content_path {
        None
    } else {
        Some(short.to_string())
    }
}
