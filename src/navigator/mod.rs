//! Navigator state machine.
//!
//! Drives the attempt lifecycle `NOT_STARTED → RUNNING → {FINISHED |
//! CANCELLED}` over the runtime model. Navigation strategies are
//! interchangeable types over the same [`AssessmentInstance`]:
//! [`SequentialNavigator`] walks one section per page with no free
//! navigation, [`MenuNavigator`] adds section/item jumping through the
//! [`SectionJumping`] / [`ItemJumping`] capability traits. Transitions a
//! strategy does not support are simply absent from its trait surface.
//!
//! Every mutating operation runs a short critical section keyed by the
//! attempt identity: acquire the lock, re-load the latest persisted model
//! (another request may have advanced it), apply, persist, release.
//!
//! Failure semantics: protocol violations (submit before start, empty
//! payload, identifier mismatch) are `Err` and unrecoverable; timing and
//! attempt conditions are expected business outcomes carried as error
//! codes on the returned [`Info`].

pub mod menu;
pub mod sequential;

pub use menu::MenuNavigator;
pub use sequential::SequentialNavigator;

use crate::concurrency::{attempt_key, AttemptLocks};
use crate::context::item::ItemRejection;
use crate::context::{AssessmentContext, ItemInput};
use crate::definition::AssessmentDef;
use crate::error::EngineError;
use crate::eval::Evaluator;
use crate::info::{AttemptStatus, ErrorCode, Info, MessageCode};
use crate::snapshot::SnapshotStore;
use crate::types::{now, Timestamp};
use std::sync::Arc;
use tracing::{debug, info};

/// Common navigation operations supported by every strategy.
pub trait Navigator {
    /// `NOT_STARTED → RUNNING`: open the assessment and its first section.
    fn start_assessment(&mut self) -> Result<Info, EngineError>;

    /// Submit exactly one response for the current item.
    fn submit_single_item(&mut self, input: ItemInput) -> Result<Info, EngineError>;

    /// Submit a group of responses against the current section.
    fn submit_items(&mut self, inputs: Vec<ItemInput>) -> Result<Info, EngineError>;

    /// `RUNNING → FINISHED`: close and score the assessment.
    fn submit_assessment(&mut self) -> Result<Info, EngineError>;

    /// `RUNNING → CANCELLED`: close without scoring.
    fn cancel_assessment(&mut self) -> Result<Info, EngineError>;

    /// Result of the most recent operation, if any.
    fn info(&self) -> Option<&Info>;

    /// Read access to the runtime model.
    fn context(&self) -> &AssessmentContext;
}

/// Capability: menu-style repositioning of the section pointer.
pub trait SectionJumping: Navigator {
    fn go_to_section(&mut self, index: usize) -> Result<Info, EngineError>;
}

/// Capability: free item-level jumping.
pub trait ItemJumping: SectionJumping {
    fn go_to_item(&mut self, section: usize, item: usize) -> Result<Info, EngineError>;
}

/// One ready-to-drive attempt: the runtime model bound to its runtime
/// collaborators. Produced by the factory, wrapped by a strategy type.
pub struct AssessmentInstance {
    def: Arc<AssessmentDef>,
    context: AssessmentContext,
    store: Arc<dyn SnapshotStore>,
    evaluator: Arc<dyn Evaluator>,
    locks: Arc<AttemptLocks>,
    resuming: bool,
    /// Preview attempts are throwaway: they never read or write the
    /// snapshot store, so they cannot clobber a real attempt's state.
    preview: bool,
    last_info: Option<Info>,
}

impl AssessmentInstance {
    pub fn new(
        def: Arc<AssessmentDef>,
        context: AssessmentContext,
        store: Arc<dyn SnapshotStore>,
        evaluator: Arc<dyn Evaluator>,
        locks: Arc<AttemptLocks>,
        resuming: bool,
        preview: bool,
    ) -> Self {
        AssessmentInstance {
            def,
            context,
            store,
            evaluator,
            locks,
            resuming,
            preview,
            last_info: None,
        }
    }

    /// Whether this instance was restored from a persisted snapshot. A
    /// resumed attempt is already `RUNNING`; callers must not start it
    /// again.
    pub fn is_resuming(&self) -> bool {
        self.resuming
    }

    pub fn definition(&self) -> &Arc<AssessmentDef> {
        &self.def
    }

    pub fn context(&self) -> &AssessmentContext {
        &self.context
    }

    pub fn last_info(&self) -> Option<&Info> {
        self.last_info.as_ref()
    }

    /// Run one mutating operation under the attempt lock.
    ///
    /// Re-loads the latest persisted model first so concurrent requests on
    /// the same attempt see each other's writes (last-writer-sees-latest
    /// discipline), then applies the operation and persists the result.
    pub(crate) fn with_latest<F>(&mut self, apply: F) -> Result<Info, EngineError>
    where
        F: FnOnce(&mut Self) -> Result<Info, EngineError>,
    {
        let subject = self.context.subject.clone();
        let content_path = self.context.content_path.clone();
        let lock = self.locks.lock_for(&attempt_key(&subject, &content_path));
        let _guard = lock.lock();

        if !self.preview {
            if let Some(latest) = self.store.load(&subject, &content_path)? {
                // A snapshot under the same key but from a different attempt
                // (e.g. a finished previous run) is not ours to adopt.
                if latest.attempt_id == self.context.attempt_id {
                    debug!(
                        attempt_id = %self.context.attempt_id,
                        "Adopting latest persisted runtime model"
                    );
                    self.context = latest;
                }
            }
        }

        let result = apply(self);
        if let Ok(ref produced) = result {
            if !self.preview {
                self.store.save(&self.context)?;
            }
            self.last_info = Some(produced.clone());
        }
        result
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), EngineError> {
        match self.context.status {
            AttemptStatus::Running => Ok(()),
            status => Err(EngineError::NotRunning {
                operation,
                status: status.to_string(),
            }),
        }
    }

    /// Info describing an already-terminal attempt; terminal operations
    /// repeated on it are idempotent no-ops.
    fn terminal_info(&self) -> Info {
        let message = match self.context.status {
            AttemptStatus::Cancelled => MessageCode::AssessmentCancelled,
            _ => MessageCode::AssessmentSubmitted,
        };
        Info::new(self.context.status, message, false).with_feedback(self.context.output.clone())
    }

    pub(crate) fn apply_start(&mut self, now: Timestamp) -> Result<Info, EngineError> {
        if self.context.status != AttemptStatus::NotStarted {
            return Err(EngineError::AlreadyStarted);
        }
        self.context.start(now, &self.def);
        info!(
            attempt_id = %self.context.attempt_id,
            subject = %self.context.subject,
            assessment = %self.context.assessment_ident,
            "Assessment started"
        );
        if self.context.current_section().is_none() {
            // Every section is empty: there is nothing to deliver.
            return self.apply_finish(now);
        }
        // Show title/description before any questions.
        let info = Info::new(AttemptStatus::Running, MessageCode::InfoDemanded, false);
        if !self.context.is_open(now) {
            // Pathological zero/negative time budget: the attempt is
            // running but immediately unusable for submission.
            return Ok(info.with_error(ErrorCode::AssessmentOutOfTime));
        }
        Ok(info)
    }

    pub(crate) fn apply_submit_single(
        &mut self,
        input: ItemInput,
        now: Timestamp,
    ) -> Result<Info, EngineError> {
        self.ensure_running("submit_single_item")?;
        if !self.context.is_open(now) {
            return Ok(
                Info::new(AttemptStatus::Running, MessageCode::ItemSubmitted, false)
                    .with_error(ErrorCode::AssessmentOutOfTime),
            );
        }

        let section_index = self.context.current_section;
        let (section_ident, current_ident) = {
            let section = self
                .context
                .current_section()
                .ok_or(EngineError::NoCurrentSection)?;
            let item = section.current_item().ok_or(EngineError::NoCurrentItem)?;
            (section.ident.clone(), item.ident.clone())
        };
        if input.ident != current_ident {
            return Err(EngineError::IdentifierMismatch {
                expected: current_ident,
                got: input.ident,
            });
        }
        let item_def = self
            .def
            .section(&section_ident)
            .and_then(|s| s.item(&current_ident))
            .cloned()
            .ok_or_else(|| EngineError::UnknownItem(current_ident.clone()))?;

        let Some(section) = self.context.sections.get_mut(section_index) else {
            return Err(EngineError::NoCurrentSection);
        };
        if !section.is_open(now) {
            return Ok(
                Info::new(AttemptStatus::Running, MessageCode::ItemSubmitted, true)
                    .with_error(ErrorCode::SectionOutOfTime),
            );
        }
        let Some(item) = section.current_item_mut() else {
            return Err(EngineError::NoCurrentItem);
        };
        match item.check_submittable(now) {
            Err(ItemRejection::Closed) => Ok(Info::new(
                AttemptStatus::Running,
                MessageCode::ItemSubmitted,
                true,
            )
            .with_error(ErrorCode::ItemOutOfTime)),
            Err(ItemRejection::AttemptsExhausted) => Ok(Info::new(
                AttemptStatus::Running,
                MessageCode::ItemSubmitted,
                true,
            )
            .with_error(ErrorCode::AttemptsExhausted)),
            Ok(()) => {
                let score = self.evaluator.eval(&item_def, &input);
                // The position stays on the item; re-submission is bounded
                // by the attempt cap, not by the pointer.
                item.record(input, score);
                Ok(Info::new(
                    AttemptStatus::Running,
                    MessageCode::ItemSubmitted,
                    true,
                ))
            }
        }
    }

    pub(crate) fn apply_submit_many(
        &mut self,
        inputs: Vec<ItemInput>,
        now: Timestamp,
    ) -> Result<Info, EngineError> {
        self.ensure_running("submit_items")?;
        if inputs.is_empty() {
            return Err(EngineError::EmptySubmission);
        }
        if !self.context.is_open(now) {
            return Ok(Info::new(
                AttemptStatus::Running,
                MessageCode::SectionSubmitted,
                false,
            )
            .with_error(ErrorCode::AssessmentOutOfTime));
        }

        let section_index = self.context.current_section;
        let section_ident = self
            .context
            .current_section()
            .ok_or(EngineError::NoCurrentSection)?
            .ident
            .clone();
        if !self.context.sections[section_index].is_open(now) {
            return Ok(Info::new(
                AttemptStatus::Running,
                MessageCode::SectionSubmitted,
                true,
            )
            .with_error(ErrorCode::SectionOutOfTime));
        }

        // The section's time window binds the page as a whole; individual
        // item failures inside it flag the submission as partial instead
        // of rejecting the page.
        let mut partial = false;
        for input in inputs {
            let item_def = self
                .def
                .section(&section_ident)
                .and_then(|s| s.item(&input.ident))
                .cloned()
                .ok_or_else(|| EngineError::UnknownItem(input.ident.clone()))?;
            let Some(section) = self.context.sections.get_mut(section_index) else {
                return Err(EngineError::NoCurrentSection);
            };
            let Some(item) = section.item_by_ident_mut(&input.ident) else {
                return Err(EngineError::UnknownItem(input.ident));
            };
            match item.check_submittable(now) {
                Ok(()) => {
                    let score = self.evaluator.eval(&item_def, &input);
                    item.record(input, score);
                }
                Err(rejection) => {
                    debug!(
                        item = %input.ident,
                        rejection = ?rejection,
                        "Response skipped during section submission"
                    );
                    partial = true;
                }
            }
        }

        if let Some(section) = self.context.sections.get_mut(section_index) {
            section.times_submitted += 1;
        }
        let info = Info::new(
            AttemptStatus::Running,
            MessageCode::SectionSubmitted,
            true,
        );
        if partial {
            Ok(info.with_error(ErrorCode::SubmittedPartially))
        } else {
            Ok(info)
        }
    }

    pub(crate) fn apply_finish(&mut self, now: Timestamp) -> Result<Info, EngineError> {
        match self.context.status {
            AttemptStatus::NotStarted => Err(EngineError::NotRunning {
                operation: "submit_assessment",
                status: self.context.status.to_string(),
            }),
            AttemptStatus::Finished | AttemptStatus::Cancelled => Ok(self.terminal_info()),
            AttemptStatus::Running => {
                self.context.finish(now, &self.def, &*self.evaluator);
                info!(
                    attempt_id = %self.context.attempt_id,
                    subject = %self.context.subject,
                    "Assessment submitted"
                );
                Ok(Info::new(
                    AttemptStatus::Finished,
                    MessageCode::AssessmentSubmitted,
                    false,
                )
                .with_feedback(self.context.output.clone()))
            }
        }
    }

    pub(crate) fn apply_cancel(&mut self) -> Result<Info, EngineError> {
        match self.context.status {
            AttemptStatus::NotStarted => Err(EngineError::NotRunning {
                operation: "cancel_assessment",
                status: self.context.status.to_string(),
            }),
            AttemptStatus::Finished | AttemptStatus::Cancelled => Ok(self.terminal_info()),
            AttemptStatus::Running => {
                self.context.cancel();
                info!(
                    attempt_id = %self.context.attempt_id,
                    subject = %self.context.subject,
                    "Assessment cancelled"
                );
                Ok(Info::new(
                    AttemptStatus::Cancelled,
                    MessageCode::AssessmentCancelled,
                    false,
                ))
            }
        }
    }

    pub(crate) fn apply_goto_section(
        &mut self,
        index: usize,
        now: Timestamp,
    ) -> Result<Info, EngineError> {
        self.ensure_running("go_to_section")?;
        if index >= self.context.sections.len() {
            return Err(EngineError::SectionOutOfRange {
                index,
                count: self.context.sections.len(),
            });
        }
        self.context.position_at_section(index, now);
        Ok(Info::new(
            AttemptStatus::Running,
            MessageCode::SectionShown,
            true,
        ))
    }

    pub(crate) fn apply_goto_item(
        &mut self,
        section: usize,
        item: usize,
        now: Timestamp,
    ) -> Result<Info, EngineError> {
        self.ensure_running("go_to_item")?;
        if section >= self.context.sections.len() {
            return Err(EngineError::SectionOutOfRange {
                index: section,
                count: self.context.sections.len(),
            });
        }
        if item >= self.context.sections[section].items.len() {
            return Err(EngineError::ItemOutOfRange { section, item });
        }
        self.context.position_at_section(section, now);
        if let Some(s) = self.context.sections.get_mut(section) {
            s.current_item = item;
        }
        Ok(Info::new(
            AttemptStatus::Running,
            MessageCode::ItemShown,
            true,
        ))
    }

    /// Shared single-item submission wrapper used by both strategies.
    pub(crate) fn submit_single(&mut self, input: ItemInput) -> Result<Info, EngineError> {
        self.with_latest(|inst| inst.apply_submit_single(input, now()))
    }

    pub(crate) fn start(&mut self) -> Result<Info, EngineError> {
        self.with_latest(|inst| inst.apply_start(now()))
    }

    pub(crate) fn finish(&mut self) -> Result<Info, EngineError> {
        self.with_latest(|inst| inst.apply_finish(now()))
    }

    pub(crate) fn cancel(&mut self) -> Result<Info, EngineError> {
        self.with_latest(|inst| inst.apply_cancel())
    }
}
