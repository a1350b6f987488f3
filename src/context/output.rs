//! Completion feedback model.
//!
//! An [`Output`] is computed once, when the attempt finishes and the
//! definition declares feedback availability. It is cached on the
//! assessment context (and therefore persisted with the final snapshot)
//! and handed to the caller through the terminal Info.

use crate::context::item::Score;
use crate::types::{ItemIdent, Timestamp};
use serde::{Deserialize, Serialize};

/// Per-item feedback line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFeedback {
    pub ident: ItemIdent,
    pub attempts_made: u32,
    /// `None` when the item was never answered.
    pub score: Option<Score>,
}

/// Per-section score rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionFeedback {
    pub ident: String,
    pub points: f64,
    pub max_points: f64,
    pub times_submitted: u32,
    pub items: Vec<ItemFeedback>,
}

/// Assessment-level feedback attached at completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub assessment_ident: String,
    pub points: f64,
    pub max_points: f64,
    pub passed: bool,
    pub sections: Vec<SectionFeedback>,
    pub generated_at: Timestamp,
}
