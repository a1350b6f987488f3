//! Static test definitions.
//!
//! The definition tree (assessment → sections → items, plus object banks)
//! is loaded once per attempt by the resolver and never mutated by the
//! runtime. Multiple concurrent attempts may share one definition instance
//! read-only behind an `Arc`.

use crate::error::ResolveError;
use crate::types::ItemIdent;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Root of an immutable test definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentDef {
    /// Unique identifier for this assessment.
    pub ident: String,
    /// Human-readable title shown before the first section.
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Ordered sections walked by the navigator.
    #[serde(default)]
    pub sections: Vec<SectionDef>,
    /// Global time budget in seconds, counted from assessment start.
    /// Zero and negative budgets are legal definitions; they produce an
    /// assessment that is closed the instant it starts.
    #[serde(default)]
    pub time_limit_secs: Option<i64>,
    /// Whether completion feedback is attached when the attempt finishes.
    #[serde(default)]
    pub feedback_available: bool,
}

/// One ordered section of items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDef {
    pub ident: String,
    pub title: String,
    #[serde(default)]
    pub items: Vec<ItemDef>,
    /// Section time budget in seconds, counted from first open.
    #[serde(default)]
    pub time_limit_secs: Option<i64>,
}

/// One question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub ident: ItemIdent,
    pub title: String,
    /// Maximum accepted responses; 0 means unlimited.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Item time budget in seconds, counted from first open.
    #[serde(default)]
    pub time_limit_secs: Option<i64>,
    /// Response/scoring template, opaque to this engine. Interpreted only
    /// by the injected [`crate::eval::Evaluator`].
    #[serde(default)]
    pub template: serde_json::Value,
}

fn default_max_attempts() -> u32 {
    1
}

/// A named pool of reusable item definitions referenced during authoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectBankDef {
    pub ident: String,
    #[serde(default)]
    pub items: Vec<ItemDef>,
}

/// One authoring revision note attached to a definition bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub version: String,
    pub date: String,
    pub note: String,
}

impl AssessmentDef {
    /// Validate structural invariants before any runtime model is built.
    ///
    /// Item identifiers must be unique within their owning section, since
    /// the runtime resolves submitted responses by identifier.
    pub fn validate(&self) -> Result<(), ResolveError> {
        for section in &self.sections {
            let mut seen: HashSet<&str> = HashSet::new();
            for item in &section.items {
                if !seen.insert(item.ident.as_str()) {
                    return Err(ResolveError::DuplicateItem {
                        section: section.ident.clone(),
                        item: item.ident.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Look up a section by identifier.
    pub fn section(&self, ident: &str) -> Option<&SectionDef> {
        self.sections.iter().find(|s| s.ident == ident)
    }

    /// Look up an item by identifier across all sections.
    pub fn item(&self, ident: &str) -> Option<&ItemDef> {
        self.sections.iter().flat_map(|s| s.items.iter()).find(|i| i.ident == ident)
    }
}

impl SectionDef {
    pub fn item(&self, ident: &str) -> Option<&ItemDef> {
        self.items.iter().find(|i| i.ident == ident)
    }
}

impl ItemDef {
    /// Whether `attempts_made` leaves room for one more response.
    pub fn attempts_left(&self, attempts_made: u32) -> bool {
        self.max_attempts == 0 || attempts_made < self.max_attempts
    }
}
