//! Section-level runtime state.

use crate::context::item::ItemContext;
use crate::definition::SectionDef;
use crate::types::Timestamp;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Runtime state for one section within one attempt.
///
/// `current_item == items.len()` is the "finished" sentinel; otherwise it
/// is a valid index into `items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionContext {
    pub ident: String,
    pub time_limit_secs: Option<i64>,
    pub items: Vec<ItemContext>,
    pub current_item: usize,
    pub opened_at: Option<Timestamp>,
    pub closes_at: Option<Timestamp>,
    pub times_submitted: u32,
}

impl SectionContext {
    pub fn from_def(def: &SectionDef) -> Self {
        SectionContext {
            ident: def.ident.clone(),
            time_limit_secs: def.time_limit_secs,
            items: def.items.iter().map(ItemContext::from_def).collect(),
            current_item: 0,
            opened_at: None,
            closes_at: None,
            times_submitted: 0,
        }
    }

    /// Open the section clock and all item clocks. First open wins; a
    /// revisit through menu navigation never resets timers.
    pub fn open(&mut self, now: Timestamp) {
        if self.opened_at.is_none() {
            self.opened_at = Some(now);
            self.closes_at = self.time_limit_secs.map(|s| now + Duration::seconds(s));
        }
        for item in &mut self.items {
            item.open(now);
        }
    }

    pub fn is_open(&self, now: Timestamp) -> bool {
        match self.opened_at {
            None => false,
            Some(_) => self.closes_at.map_or(true, |closes| now < closes),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at the current position, or `None` at the finished sentinel.
    pub fn current_item(&self) -> Option<&ItemContext> {
        self.items.get(self.current_item)
    }

    pub fn current_item_mut(&mut self) -> Option<&mut ItemContext> {
        self.items.get_mut(self.current_item)
    }

    /// Advance the item pointer, saturating at the finished sentinel.
    pub fn advance_item(&mut self) {
        if self.current_item < self.items.len() {
            self.current_item += 1;
        }
    }

    pub fn item_by_ident_mut(&mut self, ident: &str) -> Option<&mut ItemContext> {
        self.items.iter_mut().find(|i| i.ident == ident)
    }
}
