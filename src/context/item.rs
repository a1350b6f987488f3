//! Item-level runtime state.

use crate::definition::ItemDef;
use crate::types::{ItemIdent, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// One collected response. The value is opaque to the engine; only the
/// injected evaluator interprets it against the item's template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInput {
    pub ident: ItemIdent,
    pub value: serde_json::Value,
}

/// Cached result of evaluating the latest recorded response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub points: f64,
    pub max_points: f64,
    pub passed: bool,
}

/// Why an individual response was not accepted. Expected, recoverable
/// outcomes; the section-level submission maps these to Info error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRejection {
    Closed,
    AttemptsExhausted,
}

/// Runtime state for one item within one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemContext {
    pub ident: ItemIdent,
    /// Copied from the definition so a snapshot is self-contained.
    pub max_attempts: u32,
    pub time_limit_secs: Option<i64>,
    pub opened_at: Option<Timestamp>,
    pub closes_at: Option<Timestamp>,
    pub attempts_made: u32,
    pub input: Option<ItemInput>,
    pub score: Option<Score>,
}

impl ItemContext {
    pub fn from_def(def: &ItemDef) -> Self {
        ItemContext {
            ident: def.ident.clone(),
            max_attempts: def.max_attempts,
            time_limit_secs: def.time_limit_secs,
            opened_at: None,
            closes_at: None,
            attempts_made: 0,
            input: None,
            score: None,
        }
    }

    /// Open the item clock. First open wins; revisits never reset timers.
    pub fn open(&mut self, now: Timestamp) {
        if self.opened_at.is_none() {
            self.opened_at = Some(now);
            self.closes_at = self.time_limit_secs.map(|s| now + Duration::seconds(s));
        }
    }

    /// An item is open iff it has been opened and `now` is before its
    /// close time (or it has no limit).
    pub fn is_open(&self, now: Timestamp) -> bool {
        match self.opened_at {
            None => false,
            Some(_) => self.closes_at.map_or(true, |closes| now < closes),
        }
    }

    pub fn attempts_left(&self) -> bool {
        self.max_attempts == 0 || self.attempts_made < self.max_attempts
    }

    /// Check whether a new response may be recorded right now.
    pub fn check_submittable(&self, now: Timestamp) -> Result<(), ItemRejection> {
        if !self.is_open(now) {
            return Err(ItemRejection::Closed);
        }
        if !self.attempts_left() {
            return Err(ItemRejection::AttemptsExhausted);
        }
        Ok(())
    }

    /// Record an accepted response and its evaluated score.
    ///
    /// Callers must have passed `check_submittable` first; recording always
    /// consumes one attempt and replaces the cached score.
    pub fn record(&mut self, input: ItemInput, score: Score) {
        self.attempts_made += 1;
        self.input = Some(input);
        self.score = Some(score);
    }
}
