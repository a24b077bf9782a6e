use std::collections::HashSet;
use std::fmt::{self, Display};

use rand::seq::SliceRandom;
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::infer::{Deduction, InconsistencyError, KnowledgeBase, Sentence};
use crate::internal_util::{all_cells, in_bounds, neighbours};
use crate::Coord;

/// An observation the engine refuses to take in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeError {
    /// The cell is not on the board
    OutOfBounds {
        cell: Coord,
        height: usize,
        width: usize,
    },
    /// More mines were reported than the cell has neighbours
    CountExceedsNeighbours {
        cell: Coord,
        count: usize,
        neighbours: usize,
    },
    /// The observation contradicts what is already known
    Inconsistent(InconsistencyError),
}
impl Display for KnowledgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds {
                cell,
                height,
                width,
            } => write!(f, "cell {cell:?} is outside the {height}x{width} board"),
            Self::CountExceedsNeighbours {
                cell,
                count,
                neighbours,
            } => {
                write!(
                    f,
                    "cell {cell:?} reports {count} mines but has only {neighbours} \
                     neighbours"
                )
            },
            Self::Inconsistent(err) => Display::fmt(err, f),
        }
    }
}
impl std::error::Error for KnowledgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inconsistent(err) => Some(err),
            _ => None,
        }
    }
}
impl From<InconsistencyError> for KnowledgeError {
    fn from(err: InconsistencyError) -> Self {
        Self::Inconsistent(err)
    }
}

/// Minesweeper player that only ever acts on what it can prove.
///
/// Fed one observation at a time (a revealed cell and how many of its
/// neighbours are mines); never looks at the board itself.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InferenceEngine {
    height: usize,
    width: usize,
    /// Cells that have been revealed
    moves_made: HashSet<Coord>,
    knowledge: KnowledgeBase<Coord>,
}
impl InferenceEngine {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            moves_made: HashSet::new(),
            knowledge: KnowledgeBase::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn moves_made(&self) -> &HashSet<Coord> {
        &self.moves_made
    }

    pub fn safes(&self) -> &HashSet<Coord> {
        self.knowledge.safes()
    }

    pub fn mines(&self) -> &HashSet<Coord> {
        self.knowledge.mines()
    }

    pub fn sentences(&self) -> impl Iterator<Item = &Sentence<Coord>> {
        self.knowledge.sentences()
    }

    pub fn knowledge(&self) -> &KnowledgeBase<Coord> {
        &self.knowledge
    }

    /// No sentence is left that could still yield a fact
    pub fn is_resolved(&self) -> bool {
        self.knowledge.sentences().next().is_none()
    }

    /// Record a cell known (from elsewhere, e.g. a flag) to be a mine, then
    /// deduce everything that follows.
    ///
    /// # Errors
    ///
    /// On any [`KnowledgeError`] the engine is left exactly as it was.
    pub fn mark_mine(&mut self, cell: Coord) -> Result<Deduction<Coord>, KnowledgeError> {
        self.check_bounds(cell)?;
        self.atomically(|engine| {
            engine.knowledge.mark_mine(&cell)?;
            debug!(?cell, "marked mine");
            Ok(engine.knowledge.infer()?)
        })
    }

    /// Record a cell known (from elsewhere) to be safe, then deduce everything
    /// that follows.
    ///
    /// # Errors
    ///
    /// On any [`KnowledgeError`] the engine is left exactly as it was.
    pub fn mark_safe(&mut self, cell: Coord) -> Result<Deduction<Coord>, KnowledgeError> {
        self.check_bounds(cell)?;
        self.atomically(|engine| {
            engine.knowledge.mark_safe(&cell)?;
            debug!(?cell, "marked safe");
            Ok(engine.knowledge.infer()?)
        })
    }

    /// Take in that `cell` was revealed safely with `count` mines around it,
    /// then deduce everything that follows.
    ///
    /// # Errors
    ///
    /// See [`KnowledgeError`]. An `Inconsistent` error raised during deduction
    /// means earlier knowledge contradicts this observation. On any error the
    /// engine is left exactly as it was.
    pub fn add_knowledge(
        &mut self,
        cell: Coord,
        count: usize,
    ) -> Result<Deduction<Coord>, KnowledgeError> {
        self.check_bounds(cell)?;
        self.atomically(|engine| engine.observe(cell, count))
    }

    fn observe(
        &mut self,
        cell: Coord,
        count: usize,
    ) -> Result<Deduction<Coord>, KnowledgeError> {
        let neighbours = neighbours(cell, self.height, self.width).collect::<Vec<_>>();
        if count > neighbours.len() {
            return Err(KnowledgeError::CountExceedsNeighbours {
                cell,
                count,
                neighbours: neighbours.len(),
            });
        }
        if self.knowledge.is_mine(&cell) {
            return Err(InconsistencyError("Revealed cell is known to be a mine").into());
        }

        let (known_mines, unknown): (Vec<_>, Vec<_>) = neighbours
            .into_iter()
            .filter(|neighbour| !self.knowledge.is_safe(neighbour))
            .partition(|neighbour| self.knowledge.is_mine(neighbour));
        let remaining = count.checked_sub(known_mines.len()).ok_or(InconsistencyError(
            "Fewer mines reported than are already known around the cell",
        ))?;
        let sentence = Sentence::new(remaining, unknown)?;
        debug!(?cell, count, %sentence, "adding knowledge");

        self.moves_made.insert(cell);
        self.knowledge.mark_safe(&cell)?;
        self.knowledge.add_sentence(sentence)?;

        let deduction = self.knowledge.infer()?;
        debug!(
            ?cell,
            new_mines = deduction.mines.len(),
            new_safes = deduction.safes.len(),
            derived = deduction.derived,
            passes = deduction.passes,
            "finished deduction"
        );
        Ok(deduction)
    }

    /// A cell proven safe that has not been revealed yet, if there is one.
    ///
    /// The smallest such cell is chosen so that play is reproducible.
    pub fn make_safe_move(&self) -> Option<Coord> {
        self.knowledge
            .safes()
            .difference(&self.moves_made)
            .min()
            .copied()
    }

    /// Any cell that is neither revealed nor a known mine, chosen uniformly.
    ///
    /// This is the fallback for when nothing is certain, so the cell may well
    /// be a mine.
    pub fn make_random_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Coord> {
        all_cells(self.height, self.width)
            .filter(|cell| !self.moves_made.contains(cell) && !self.knowledge.is_mine(cell))
            .collect::<Vec<_>>()
            .choose(rng)
            .copied()
    }

    /// Run `update`, rolling back every change if it fails
    fn atomically<R>(
        &mut self,
        update: impl FnOnce(&mut Self) -> Result<R, KnowledgeError>,
    ) -> Result<R, KnowledgeError> {
        let moves_made = self.moves_made.clone();
        let knowledge = self.knowledge.clone();
        let result = update(self);
        if let Err(err) = &result {
            debug!(%err, "rolling back rejected update");
            self.moves_made = moves_made;
            self.knowledge = knowledge;
        }
        result
    }

    fn check_bounds(&self, cell: Coord) -> Result<(), KnowledgeError> {
        if in_bounds(cell, self.height, self.width) {
            Ok(())
        } else {
            Err(KnowledgeError::OutOfBounds {
                cell,
                height: self.height,
                width: self.width,
            })
        }
    }
}
