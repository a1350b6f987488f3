//! Runtime model: the mutable state tree of one in-progress attempt.
//!
//! One [`AssessmentContext`] owns ordered [`SectionContext`]s which own
//! ordered [`ItemContext`]s. The whole tree is serialized after every
//! navigator mutation and reconstructed byte-for-byte on resume; it never
//! references its collaborators (resolver, store, evaluator), which are
//! rebound fresh by the factory on every request.

pub mod assessment;
pub mod item;
pub mod output;
pub mod section;

pub use assessment::AssessmentContext;
pub use item::{ItemContext, ItemInput, ItemRejection, Score};
pub use output::{ItemFeedback, Output, SectionFeedback};
pub use section::SectionContext;
