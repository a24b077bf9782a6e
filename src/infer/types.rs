use std::collections::HashSet;
use std::fmt::{self, Display};
use std::mem;

use frozenset::{Freeze, FrozenSet};
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Cell;

/// The state of the knowledge base is logically inconsistent.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct InconsistencyError(pub &'static str);
impl Display for InconsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inconsistent knowledge: {}", self.0)
    }
}
impl std::error::Error for InconsistencyError {
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// A logical statement about the board: exactly `count` of `cells` are mines.
///
/// Sentences only ever shrink, as cells within them become known. The count
/// is kept within `0..=cells.len()` by every operation.
pub struct Sentence<T: Cell> {
    /// Cells whose state is not yet known
    cells: FrozenSet<T>,
    /// How many of `cells` are mines
    count: usize,
}
impl<T: Cell> Sentence<T> {
    pub fn new(
        count: usize,
        cells: impl IntoIterator<Item = T>,
    ) -> Result<Self, InconsistencyError> {
        let cells = cells.into_iter().collect::<FrozenSet<_>>();
        if count > cells.len() {
            return Err(InconsistencyError("Sentence with more mines than cells"));
        }
        Ok(Self {
            cells,
            count,
        })
    }

    pub fn cells(&self) -> &FrozenSet<T> {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// A sentence with no cells left says nothing
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, cell: &T) -> bool {
        self.cells.contains(cell)
    }

    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.cells.is_subset(&other.cells)
    }

    /// Every cell, if the sentence says all of them are mines
    pub fn known_mines(&self) -> HashSet<T> {
        if self.count > 0 && self.count == self.cells.len() {
            self.cells.iter().cloned().collect()
        } else {
            HashSet::new()
        }
    }

    /// Every cell, if the sentence says none of them are mines
    pub fn known_safes(&self) -> HashSet<T> {
        if self.count == 0 {
            self.cells.iter().cloned().collect()
        } else {
            HashSet::new()
        }
    }

    /// Remove a cell known to be a mine; the sentence then has one fewer mine
    /// to account for.
    ///
    /// Returns whether the cell was part of this sentence.
    ///
    /// # Errors
    ///
    /// If the sentence has no mines left to give, the sentence is left
    /// untouched and an error is returned.
    pub fn mark_mine(&mut self, cell: &T) -> Result<bool, InconsistencyError> {
        if !self.cells.contains(cell) {
            return Ok(false);
        }
        if self.count == 0 {
            return Err(InconsistencyError(
                "Mine marked in a sentence with no mines remaining",
            ));
        }
        self.remove(cell);
        self.count -= 1;
        Ok(true)
    }

    /// Remove a cell known to be safe; the count is unchanged.
    ///
    /// Returns whether the cell was part of this sentence.
    ///
    /// # Errors
    ///
    /// If every cell of the sentence must be a mine, the sentence is left
    /// untouched and an error is returned.
    pub fn mark_safe(&mut self, cell: &T) -> Result<bool, InconsistencyError> {
        if !self.cells.contains(cell) {
            return Ok(false);
        }
        if self.count == self.cells.len() {
            return Err(InconsistencyError(
                "Safe cell marked in a sentence made entirely of mines",
            ));
        }
        self.remove(cell);
        Ok(true)
    }

    /// If `sub` is a sub-sentence of this one, the cells only this sentence
    /// contains must hold the mines only this sentence accounts for.
    pub fn subtract(&self, sub: &Self) -> Result<Self, InconsistencyError> {
        if !sub.is_subset_of(self) {
            return Err(InconsistencyError("Subtraction of non-subsentence"));
        }
        let count = self.count.checked_sub(sub.count).ok_or(InconsistencyError(
            "Sub-sentence contains more mines than its super-sentence",
        ))?;
        Self::new(count, self.cells.difference(&sub.cells).cloned())
    }

    fn remove(&mut self, cell: &T) {
        let mut cells = mem::take(&mut self.cells).thaw();
        cells.remove(cell);
        self.cells = cells.freeze();
    }
}
impl<T: Cell + Ord> Display for Sentence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}} = {}",
            self.cells
                .iter()
                .sorted()
                .map(|cell| format!("{cell:?}"))
                .join(", "),
            self.count
        )
    }
}
