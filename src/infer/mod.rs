//! Certainty-only inference over "exactly N of these cells are mines"
//! sentences.

mod knowledge;
mod types;

pub use knowledge::{Deduction, KnowledgeBase};
pub use types::{InconsistencyError, Sentence};
