//! A minesweeper player that keeps a knowledge base of sentences ("exactly N
//! of these cells are mines") and only acts on what it can prove.
//!
//! Feed observations to an [`InferenceEngine`] with
//! [`InferenceEngine::add_knowledge`]; it deduces which cells are certainly
//! safe or certainly mines, and [`InferenceEngine::make_safe_move`] hands out
//! the former.
use std::fmt::Debug;
use std::hash::Hash;

mod engine;
pub mod infer;
mod internal_util;
pub mod util;

pub use engine::{InferenceEngine, KnowledgeError};
pub use infer::{Deduction, InconsistencyError, KnowledgeBase, Sentence};

/// A type that can be used to uniquely identify a cell on the board.
///
/// Automatically implemented for any eligible type.
pub trait Cell: Clone + Hash + Eq + Debug {}
impl<T: Clone + Hash + Eq + Debug> Cell for T {
}

/// Position of a cell on a grid, as `(row, column)`
pub type Coord = (usize, usize);
