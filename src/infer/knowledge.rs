use std::collections::HashSet;

use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::infer::{InconsistencyError, Sentence};
use crate::Cell;

/// Summary of what a round of inference learnt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduction<T: Cell> {
    /// Cells newly proven to be mines
    pub mines: HashSet<T>,
    /// Cells newly proven to be safe
    pub safes: HashSet<T>,
    /// Number of sentences derived by subset entailment
    pub derived: usize,
    /// Number of full passes made before reaching the fixpoint
    pub passes: usize,
}
impl<T: Cell> Deduction<T> {
    pub fn new() -> Self {
        Self {
            mines: HashSet::new(),
            safes: HashSet::new(),
            derived: 0,
            passes: 0,
        }
    }

    /// Did inference learn anything at all?
    pub fn is_empty(&self) -> bool {
        self.mines.is_empty() && self.safes.is_empty() && self.derived == 0
    }
}
impl<T: Cell> Default for Deduction<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything known for certain about a board, plus the live sentences that
/// may yet yield more.
///
/// Invariants (kept by every method here):
/// - no cell is both in `safes` and in `mines`
/// - once [`KnowledgeBase::infer`] returns, no live sentence references a
///   cell in `safes` or `mines`
///
/// An [`InconsistencyError`] means the facts fed in contradict each other.
/// A rejected mark changes nothing, but [`KnowledgeBase::infer`] may stop
/// half-way through a pass; callers wanting to keep going should restore an
/// earlier clone.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KnowledgeBase<T: Cell> {
    safes: HashSet<T>,
    mines: HashSet<T>,
    sentences: HashSet<Sentence<T>>,
}
impl<T: Cell> KnowledgeBase<T> {
    pub fn new() -> Self {
        Self {
            safes: HashSet::new(),
            mines: HashSet::new(),
            sentences: HashSet::new(),
        }
    }

    pub fn safes(&self) -> &HashSet<T> {
        &self.safes
    }

    pub fn mines(&self) -> &HashSet<T> {
        &self.mines
    }

    pub fn sentences(&self) -> impl Iterator<Item = &Sentence<T>> {
        self.sentences.iter()
    }

    pub fn is_mine(&self, cell: &T) -> bool {
        self.mines.contains(cell)
    }

    pub fn is_safe(&self, cell: &T) -> bool {
        self.safes.contains(cell)
    }

    /// Record `cell` as a mine and remove it from every live sentence.
    ///
    /// Returns `true` if this was not already known. A rejected mark leaves
    /// the knowledge base untouched.
    pub fn mark_mine(&mut self, cell: &T) -> Result<bool, InconsistencyError> {
        if self.safes.contains(cell) {
            return Err(InconsistencyError("Cell is already known to be safe"));
        }
        if self.mines.contains(cell) {
            return Ok(false);
        }
        self.update_sentences(|sentence| sentence.mark_mine(cell))?;
        self.mines.insert(cell.clone());
        Ok(true)
    }

    /// Record `cell` as safe and remove it from every live sentence.
    ///
    /// Returns `true` if this was not already known. A rejected mark leaves
    /// the knowledge base untouched.
    pub fn mark_safe(&mut self, cell: &T) -> Result<bool, InconsistencyError> {
        if self.mines.contains(cell) {
            return Err(InconsistencyError("Cell is already known to be a mine"));
        }
        if self.safes.contains(cell) {
            return Ok(false);
        }
        self.update_sentences(|sentence| sentence.mark_safe(cell))?;
        self.safes.insert(cell.clone());
        Ok(true)
    }

    /// Apply `update` to every sentence. Sentences that become equal collapse
    /// into one. Nothing is replaced unless every sentence accepts the update.
    fn update_sentences(
        &mut self,
        mut update: impl FnMut(&mut Sentence<T>) -> Result<bool, InconsistencyError>,
    ) -> Result<(), InconsistencyError> {
        let sentences = self
            .sentences
            .iter()
            .cloned()
            .map(|mut sentence| update(&mut sentence).map(|_| sentence))
            .collect::<Result<HashSet<_>, _>>()?;
        self.sentences = sentences;
        Ok(())
    }

    /// Add a sentence, first stripping it of every cell already known.
    ///
    /// Returns `true` if the sentence carried anything new.
    pub fn add_sentence(
        &mut self,
        mut sentence: Sentence<T>,
    ) -> Result<bool, InconsistencyError> {
        for mine in &self.mines {
            sentence.mark_mine(mine)?;
        }
        for safe in &self.safes {
            sentence.mark_safe(safe)?;
        }
        if sentence.is_empty() {
            return Ok(false);
        }
        Ok(self.sentences.insert(sentence))
    }

    /// Run deduction until a full pass yields nothing new.
    ///
    /// Each pass drops empty sentences, records every cell a sentence pins down
    /// and then applies subset entailment to every ordered pair of sentences.
    /// Every pass that does not terminate grows either `mines ∪ safes` or the
    /// set of sentences, both of which are finite, so the loop always ends.
    pub fn infer(&mut self) -> Result<Deduction<T>, InconsistencyError> {
        let mut deduction = Deduction::new();
        loop {
            deduction.passes += 1;
            let mut changed = false;

            self.sentences.retain(|sentence| !sentence.is_empty());

            let mut mines_to_mark = HashSet::new();
            let mut safes_to_mark = HashSet::new();
            for sentence in &self.sentences {
                mines_to_mark.extend(sentence.known_mines());
                safes_to_mark.extend(sentence.known_safes());
            }
            if !mines_to_mark.is_disjoint(&safes_to_mark) {
                return Err(InconsistencyError(
                    "Cell deduced to be both a mine and safe",
                ));
            }
            for cell in safes_to_mark {
                if self.mark_safe(&cell)? {
                    debug!(?cell, "deduced safe");
                    deduction.safes.insert(cell);
                    changed = true;
                }
            }
            for cell in mines_to_mark {
                if self.mark_mine(&cell)? {
                    debug!(?cell, "deduced mine");
                    deduction.mines.insert(cell);
                    changed = true;
                }
            }

            let derived = self.entailed_sentences()?;
            if !derived.is_empty() {
                deduction.derived += derived.len();
                self.sentences.extend(derived);
                changed = true;
            }

            trace!(
                pass = deduction.passes,
                sentences = self.sentences.len(),
                changed,
                "finished inference pass"
            );
            if !changed {
                break;
            }
        }
        self.sentences.retain(|sentence| !sentence.is_empty());
        Ok(deduction)
    }

    /// For every pair of distinct sentences where one's cells are a subset of
    /// the other's, the sentence over the cells they do not share. Only
    /// sentences not already known are returned.
    fn entailed_sentences(&self) -> Result<HashSet<Sentence<T>>, InconsistencyError> {
        let mut derived = HashSet::new();
        for (sub, sup) in self
            .sentences
            .iter()
            .cartesian_product(self.sentences.iter())
            .filter(|(sub, sup)| {
                sub != sup && !sub.is_empty() && sub.is_subset_of(sup)
            })
        {
            let sentence = sup.subtract(sub)?;
            if !sentence.is_empty() && !self.sentences.contains(&sentence) {
                derived.insert(sentence);
            }
        }
        Ok(derived)
    }
}
impl<T: Cell> Default for KnowledgeBase<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sentence(count: usize, cells: &[(usize, usize)]) -> Sentence<(usize, usize)> {
        Sentence::new(count, cells.iter().copied()).unwrap()
    }

    #[test]
    fn subset_inference() {
        let mut kb = KnowledgeBase::new();
        kb.add_sentence(sentence(1, &[(1, 1), (1, 2)])).unwrap();
        kb.add_sentence(sentence(2, &[(1, 1), (1, 2), (1, 3)])).unwrap();
        let deduction = kb.infer().unwrap();
        assert!(kb.is_mine(&(1, 3)));
        assert_eq!(deduction.mines, HashSet::from([(1, 3)]));
        assert!(deduction.safes.is_empty());
        assert_eq!(
            kb.sentences().cloned().collect::<HashSet<_>>(),
            HashSet::from([sentence(1, &[(1, 1), (1, 2)])])
        );
    }

    #[test]
    fn subset_inference_of_safes() {
        let mut kb = KnowledgeBase::new();
        kb.add_sentence(sentence(1, &[(0, 0), (0, 1)])).unwrap();
        kb.add_sentence(sentence(1, &[(0, 0), (0, 1), (0, 2), (0, 3)]))
            .unwrap();
        kb.infer().unwrap();
        assert_eq!(kb.safes(), &HashSet::from([(0, 2), (0, 3)]));
        assert!(kb.mines().is_empty());
    }

    #[test]
    fn marking_propagates_into_sentences() {
        let mut kb = KnowledgeBase::new();
        kb.add_sentence(sentence(1, &[(0, 0), (0, 1), (0, 2)])).unwrap();
        assert_eq!(kb.mark_mine(&(0, 1)), Ok(true));
        assert_eq!(
            kb.sentences().cloned().collect::<Vec<_>>(),
            vec![sentence(0, &[(0, 0), (0, 2)])]
        );
    }

    #[test]
    fn marking_safe_twice_is_idempotent() {
        let mut kb = KnowledgeBase::new();
        kb.add_sentence(sentence(1, &[(0, 0), (0, 1), (0, 2)])).unwrap();
        assert_eq!(kb.mark_safe(&(0, 0)), Ok(true));
        let once = kb.clone();
        assert_eq!(kb.mark_safe(&(0, 0)), Ok(false));
        assert_eq!(kb, once);
    }

    #[test]
    fn mines_and_safes_are_exclusive() {
        let mut kb = KnowledgeBase::new();
        kb.mark_safe(&(0, 0)).unwrap();
        assert!(kb.mark_mine(&(0, 0)).is_err());
        kb.mark_mine(&(1, 1)).unwrap();
        assert!(kb.mark_safe(&(1, 1)).is_err());
        assert!(kb.mines().is_disjoint(kb.safes()));
    }

    #[test]
    fn rejected_mark_changes_nothing() {
        let mut kb = KnowledgeBase::new();
        kb.add_sentence(sentence(0, &[(0, 0), (0, 1)])).unwrap();
        kb.add_sentence(sentence(1, &[(1, 0), (1, 1)])).unwrap();
        let before = kb.clone();
        assert!(kb.mark_mine(&(0, 0)).is_err());
        assert_eq!(kb, before);

        kb.add_sentence(sentence(1, &[(2, 0)])).unwrap();
        let before = kb.clone();
        assert!(kb.mark_safe(&(2, 0)).is_err());
        assert_eq!(kb, before);
        assert!(!kb.is_safe(&(2, 0)));
    }

    #[test]
    fn added_sentences_are_normalised() {
        let mut kb = KnowledgeBase::new();
        kb.mark_mine(&(0, 0)).unwrap();
        kb.mark_safe(&(0, 1)).unwrap();
        assert_eq!(kb.add_sentence(sentence(2, &[(0, 0), (0, 1), (0, 2)])), Ok(true));
        assert_eq!(
            kb.sentences().cloned().collect::<Vec<_>>(),
            vec![sentence(1, &[(0, 2)])]
        );
    }

    #[test]
    fn duplicate_and_empty_sentences_are_dropped() {
        let mut kb = KnowledgeBase::new();
        assert_eq!(kb.add_sentence(sentence(1, &[(0, 0), (0, 1)])), Ok(true));
        assert_eq!(kb.add_sentence(sentence(1, &[(0, 1), (0, 0)])), Ok(false));
        assert_eq!(kb.add_sentence(sentence(0, &[])), Ok(false));
        assert_eq!(kb.sentences().count(), 1);
    }

    #[test]
    fn chained_inference_reaches_fixpoint() {
        // (0,0) is safe, so (0,1) is the mine in the first sentence; the
        // second sentence then has no mines left for (0,2)
        let mut kb = KnowledgeBase::new();
        kb.add_sentence(sentence(0, &[(0, 0)])).unwrap();
        kb.add_sentence(sentence(1, &[(0, 0), (0, 1)])).unwrap();
        kb.add_sentence(sentence(1, &[(0, 1), (0, 2)])).unwrap();
        let deduction = kb.infer().unwrap();
        assert_eq!(kb.safes(), &HashSet::from([(0, 0), (0, 2)]));
        assert_eq!(kb.mines(), &HashSet::from([(0, 1)]));
        assert_eq!(kb.sentences().count(), 0);
        assert!(deduction.passes <= 3 * 3);
    }

    #[test]
    fn infer_without_new_knowledge_is_a_single_pass() {
        let mut kb = KnowledgeBase::new();
        kb.add_sentence(sentence(1, &[(0, 0), (0, 1)])).unwrap();
        let deduction = kb.infer().unwrap();
        assert!(deduction.is_empty());
        assert_eq!(deduction.passes, 1);
    }

    #[test]
    fn contradiction_is_reported() {
        let mut kb = KnowledgeBase::new();
        kb.add_sentence(sentence(2, &[(0, 0), (0, 1)])).unwrap();
        kb.add_sentence(sentence(1, &[(0, 0), (0, 1), (0, 2)])).unwrap();
        assert!(kb.infer().is_err());
    }
}
