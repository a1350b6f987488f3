//! Opaque scoring collaborator.
//!
//! Response-correctness evaluation is a black-box capability injected into
//! the engine; per-item-type grading rules live outside this core. The
//! contract is: after `eval` returns, the score and pass state reflect the
//! latest recorded response.

use crate::context::item::{ItemInput, Score};
use crate::definition::ItemDef;

/// Injected scoring capability, invoked after each recorded response.
pub trait Evaluator: Send + Sync {
    /// Score one response against the item's template.
    fn eval(&self, def: &ItemDef, input: &ItemInput) -> Score;

    /// Maximum points attainable for an item; used for feedback rollups.
    fn max_points(&self, def: &ItemDef) -> f64 {
        def.template
            .get("points")
            .and_then(|p| p.as_f64())
            .unwrap_or(1.0)
    }
}

/// Default evaluator: exact match of the response value against the
/// template's `correct` key, awarding the template's `points` (default 1).
pub struct KeyMatchEvaluator;

impl Evaluator for KeyMatchEvaluator {
    fn eval(&self, def: &ItemDef, input: &ItemInput) -> Score {
        let max_points = self.max_points(def);
        let correct = def
            .template
            .get("correct")
            .map_or(false, |expected| *expected == input.value);
        Score {
            points: if correct { max_points } else { 0.0 },
            max_points,
            passed: correct,
        }
    }
}
