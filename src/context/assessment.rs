//! Assessment-level runtime state.

use crate::context::output::{ItemFeedback, Output, SectionFeedback};
use crate::context::section::SectionContext;
use crate::definition::AssessmentDef;
use crate::eval::Evaluator;
use crate::info::AttemptStatus;
use crate::types::{AttemptId, ContentPath, SubjectId, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Root of the mutable runtime tree for one attempt.
///
/// This struct is the snapshot unit: the persister serializes exactly this
/// value after every navigator mutation. It holds no collaborator handles,
/// so resuming rebinds resolver/store/evaluator fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentContext {
    pub attempt_id: AttemptId,
    pub subject: SubjectId,
    pub content_path: ContentPath,
    pub assessment_ident: String,
    pub status: AttemptStatus,
    pub sections: Vec<SectionContext>,
    /// `sections.len()` is the "finished" sentinel.
    pub current_section: usize,
    pub started_at: Option<Timestamp>,
    pub closes_at: Option<Timestamp>,
    pub output: Option<Output>,
}

impl AssessmentContext {
    /// Build a fresh, unstarted runtime tree mirroring the definition.
    ///
    /// Every item context exists up front, unopened, so resolution of
    /// submitted responses by identifier never has to consult the
    /// definition for structure.
    pub fn new(
        attempt_id: AttemptId,
        subject: &str,
        content_path: &str,
        def: &AssessmentDef,
    ) -> Self {
        AssessmentContext {
            attempt_id,
            subject: subject.to_string(),
            content_path: content_path.to_string(),
            assessment_ident: def.ident.clone(),
            status: AttemptStatus::NotStarted,
            sections: def.sections.iter().map(SectionContext::from_def).collect(),
            current_section: 0,
            started_at: None,
            closes_at: None,
            output: None,
        }
    }

    /// Open the assessment: record start time, derive the close time, and
    /// position at the first non-empty section, opening it with all its
    /// items. An assessment with no deliverable section at all starts at
    /// the finished sentinel.
    pub fn start(&mut self, now: Timestamp, def: &AssessmentDef) {
        self.status = AttemptStatus::Running;
        self.started_at = Some(now);
        self.closes_at = def.time_limit_secs.map(|s| now + Duration::seconds(s));
        match self.sections.iter().position(|s| !s.is_empty()) {
            Some(index) => self.position_at_section(index, now),
            None => self.current_section = self.sections.len(),
        }
    }

    /// The assessment is open iff started and before its close time.
    pub fn is_open(&self, now: Timestamp) -> bool {
        match self.started_at {
            None => false,
            Some(_) => self.closes_at.map_or(true, |closes| now < closes),
        }
    }

    /// Section at the current position, or `None` at the finished sentinel.
    pub fn current_section(&self) -> Option<&SectionContext> {
        self.sections.get(self.current_section)
    }

    pub fn current_section_mut(&mut self) -> Option<&mut SectionContext> {
        self.sections.get_mut(self.current_section)
    }

    /// Reposition the section pointer, opening the target on first visit.
    pub fn position_at_section(&mut self, index: usize, now: Timestamp) {
        self.current_section = index;
        if let Some(section) = self.sections.get_mut(index) {
            section.open(now);
        }
    }

    /// Advance past the current section to the next non-empty one, opening
    /// it. Returns the new index, or `None` when the sentinel was reached.
    pub fn advance_to_next_nonempty(&mut self, now: Timestamp) -> Option<usize> {
        let mut index = self.current_section.saturating_add(1);
        while index < self.sections.len() && self.sections[index].is_empty() {
            index += 1;
        }
        if index < self.sections.len() {
            self.position_at_section(index, now);
            Some(index)
        } else {
            self.current_section = self.sections.len();
            None
        }
    }

    /// Transition to `Finished`, caching feedback when the definition
    /// declares it. No-op on an already terminal attempt.
    pub fn finish(&mut self, now: Timestamp, def: &AssessmentDef, evaluator: &dyn Evaluator) {
        if self.status.is_terminal() {
            return;
        }
        self.status = AttemptStatus::Finished;
        self.current_section = self.sections.len();
        if def.feedback_available {
            self.output = Some(self.build_output(now, def, evaluator));
        }
    }

    /// Transition to `Cancelled` without scoring. No-op when terminal.
    pub fn cancel(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = AttemptStatus::Cancelled;
        self.current_section = self.sections.len();
    }

    /// Roll up cached item scores into the completion feedback.
    ///
    /// Unanswered items contribute zero points but still count toward the
    /// maximum (their weight comes from the definition via the evaluator).
    /// The attempt passes iff every item was answered and passed.
    pub fn build_output(
        &self,
        now: Timestamp,
        def: &AssessmentDef,
        evaluator: &dyn Evaluator,
    ) -> Output {
        let mut total_points = 0.0;
        let mut total_max = 0.0;
        let mut all_passed = true;
        let mut sections = Vec::with_capacity(self.sections.len());

        for section in &self.sections {
            let section_def = def.section(&section.ident);
            let mut points = 0.0;
            let mut max_points = 0.0;
            let mut items = Vec::with_capacity(section.items.len());
            for item in &section.items {
                let item_max = section_def
                    .and_then(|s| s.item(&item.ident))
                    .map(|d| evaluator.max_points(d))
                    .unwrap_or(0.0);
                match item.score {
                    Some(score) => {
                        points += score.points;
                        max_points += item_max.max(score.max_points);
                        all_passed &= score.passed;
                    }
                    None => {
                        max_points += item_max;
                        all_passed = false;
                    }
                }
                items.push(ItemFeedback {
                    ident: item.ident.clone(),
                    attempts_made: item.attempts_made,
                    score: item.score,
                });
            }
            total_points += points;
            total_max += max_points;
            sections.push(SectionFeedback {
                ident: section.ident.clone(),
                points,
                max_points,
                times_submitted: section.times_submitted,
                items,
            });
        }

        Output {
            assessment_ident: self.assessment_ident.clone(),
            points: total_points,
            max_points: total_max,
            passed: all_passed,
            sections,
            generated_at: now,
        }
    }
}
