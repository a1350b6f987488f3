//! Transient per-operation results.
//!
//! Every navigator operation rebuilds an [`Info`] from scratch describing
//! what the caller should render next. Info values are never persisted and
//! never carried across requests.

use crate::context::Output;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptStatus {
    NotStarted,
    Running,
    Finished,
    Cancelled,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptStatus::Finished | AttemptStatus::Cancelled)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptStatus::NotStarted => "not-started",
            AttemptStatus::Running => "running",
            AttemptStatus::Finished => "finished",
            AttemptStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Human-readable message code for the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageCode {
    /// Title/description page before the first question is shown.
    InfoDemanded,
    ItemSubmitted,
    SectionSubmitted,
    AssessmentSubmitted,
    AssessmentCancelled,
    SectionShown,
    ItemShown,
}

/// Expected, recoverable rejection reasons. Each maps to an explanatory
/// banner on the re-rendered page, never to an exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    AssessmentOutOfTime,
    SectionOutOfTime,
    ItemOutOfTime,
    AttemptsExhausted,
    /// Section-at-once submission where some items individually failed a
    /// timing or attempt check; the section still counts as submitted.
    SubmittedPartially,
}

/// What the caller should display after one navigator operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    pub status: AttemptStatus,
    pub message: MessageCode,
    pub error: Option<ErrorCode>,
    /// Whether the next page renders question forms or only the message.
    pub render_items: bool,
    /// Completion feedback, present only on a finished attempt whose
    /// definition declares feedback availability.
    pub feedback: Option<Output>,
}

impl Info {
    pub fn new(status: AttemptStatus, message: MessageCode, render_items: bool) -> Self {
        Info {
            status,
            message,
            error: None,
            render_items,
            feedback: None,
        }
    }

    pub fn with_error(mut self, error: ErrorCode) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_feedback(mut self, feedback: Option<Output>) -> Self {
        self.feedback = feedback;
        self
    }

    /// True when the operation was accepted without any rejection reason.
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}
