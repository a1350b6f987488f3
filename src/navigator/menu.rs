//! Menu navigator.
//!
//! Free-navigation strategy: the test-taker jumps between sections (and
//! items) from a menu, submitting pages in any order. Repositioning never
//! opens or closes timers beyond a section's first visit; time windows are
//! section-lifetime, not visit-lifetime. Finishing is always an explicit
//! `submit_assessment`.

use crate::context::{AssessmentContext, ItemInput};
use crate::error::EngineError;
use crate::info::Info;
use crate::navigator::{AssessmentInstance, ItemJumping, Navigator, SectionJumping};
use crate::types::now;

/// Free section/item navigation.
pub struct MenuNavigator {
    instance: AssessmentInstance,
}

impl MenuNavigator {
    pub fn new(instance: AssessmentInstance) -> Self {
        MenuNavigator { instance }
    }

    pub fn instance(&self) -> &AssessmentInstance {
        &self.instance
    }

    pub fn into_instance(self) -> AssessmentInstance {
        self.instance
    }
}

impl Navigator for MenuNavigator {
    fn start_assessment(&mut self) -> Result<Info, EngineError> {
        self.instance.start()
    }

    fn submit_single_item(&mut self, input: ItemInput) -> Result<Info, EngineError> {
        self.instance.submit_single(input)
    }

    fn submit_items(&mut self, inputs: Vec<ItemInput>) -> Result<Info, EngineError> {
        self.instance
            .with_latest(|inst| inst.apply_submit_many(inputs, now()))
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

impl SectionJumping for MenuNavigator {
    fn go_to_section(&mut self, index: usize) -> Result<Info, EngineError> {
        self.instance
            .with_latest(|inst| inst.apply_goto_section(index, now()))
    }
}

impl ItemJumping for MenuNavigator {
    fn go_to_item(&mut self, section: usize, item: usize) -> Result<Info, EngineError> {
        self.instance
            .with_latest(|inst| inst.apply_goto_item(section, item, now()))
    }
}
