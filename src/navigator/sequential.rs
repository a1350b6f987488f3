//! Sequential section navigator.
//!
//! The strategy for one-section-per-page delivery with no free navigation:
//! submitting the page submits the whole current section, the pointer then
//! advances to the next non-empty section, and the assessment auto-
//! finishes when the last section was submitted or the assessment clock
//! ran out during submission. `SectionJumping`/`ItemJumping` are
//! deliberately not implemented.

use crate::context::{AssessmentContext, ItemInput};
use crate::error::EngineError;
use crate::info::{ErrorCode, Info};
use crate::navigator::{AssessmentInstance, Navigator};
use crate::types::now;

/// One-section-per-page delivery, strictly forward.
pub struct SequentialNavigator {
    instance: AssessmentInstance,
}

impl SequentialNavigator {
    pub fn new(instance: AssessmentInstance) -> Self {
        SequentialNavigator { instance }
    }

    pub fn instance(&self) -> &AssessmentInstance {
        &self.instance
    }

    pub fn into_instance(self) -> AssessmentInstance {
        self.instance
    }
}

impl Navigator for SequentialNavigator {
    fn start_assessment(&mut self) -> Result<Info, EngineError> {
        self.instance.start()
    }

    fn submit_single_item(&mut self, input: ItemInput) -> Result<Info, EngineError> {
        self.instance.submit_single(input)
    }

    /// Submit the current section and advance. One critical section covers
    /// the submission, the pointer move, and any auto-finish, so a
    /// concurrent double-submit cannot interleave between them.
    fn submit_items(&mut self, inputs: Vec<ItemInput>) -> Result<Info, EngineError> {
        self.instance.with_latest(|inst| {
            let now = now();
            let info = inst.apply_submit_many(inputs, now)?;
            match info.error {
                // The assessment clock ran out: finalize instead of
                // leaving the attempt dangling on a dead page.
                Some(ErrorCode::AssessmentOutOfTime) => {
                    return Ok(inst
                        .apply_finish(now)?
                        .with_error(ErrorCode::AssessmentOutOfTime));
                }
                // The section window closed: reject the page outright,
                // position unchanged.
                Some(ErrorCode::SectionOutOfTime) => return Ok(info),
                _ => {}
            }
            let advanced =
                inst.context.is_open(now) && inst.context.advance_to_next_nonempty(now).is_some();
            if advanced {
                return Ok(info);
            }
            // Auto-finish: last section submitted, or the clock ran out
            // during submission. A partial-submission flag from the final
            // page survives onto the terminal Info.
            let done = inst.apply_finish(now)?;
            Ok(match info.error {
                Some(code) => done.with_error(code),
                None => done,
            })
        })
    }

    fn submit_assessment(&mut self) -> Result<Info, EngineError> {
        self.instance.finish()
    }

    fn cancel_assessment(&mut self) -> Result<Info, EngineError> {
        self.instance.cancel()
    }

    fn info(&self) -> Option<&Info> {
        self.instance.last_info()
    }

    fn context(&self) -> &AssessmentContext {
        self.instance.context()
    }
}
