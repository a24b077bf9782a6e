use std::collections::HashSet;

use rand::Rng;
use tracing::{debug, info};

use crate::internal_util::{all_cells, neighbours};
use crate::{Coord, InferenceEngine, KnowledgeError};

/// Ground truth for a game: where the mines are. The engine never sees this
/// directly, only the counts it hands out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Positions of every mine
    mines: HashSet<Coord>,
    /// The width of the board
    width: usize,
    /// The height of the board
    height: usize,
}
impl Board {
    /// Create a board from an ASCII-encoded description, where:
    /// - `*` is a mine
    /// - `.` is a clear cell
    /// - Trailing or leading whitespace is ignored
    ///
    /// # Errors
    ///
    /// If the board is not rectangular, has a width or height of 0, or contains
    /// any other character, an error is returned.
    pub fn new(encoded: &str) -> Result<Self, String> {
        let lines = encoded.trim().lines().map(|l| l.trim()).collect::<Vec<_>>();
        let height = lines.len();
        if height == 0 {
            return Err("Board must have at least one row".to_string());
        }
        let width = lines[0].len();
        if width == 0 {
            return Err("Board must have at least one column".to_string());
        }
        if let Some(line) = lines.iter().find(|l| l.len() != width) {
            return Err(format!(
                concat!(
                    "Board must be rectangular (found line with length {},",
                    " expected length {})",
                ),
                line.len(),
                width,
            ));
        }
        let mut mines = HashSet::new();
        for (row, line) in lines.into_iter().enumerate() {
            for (col, c) in line.chars().enumerate() {
                match c {
                    '*' => {
                        mines.insert((row, col));
                    },
                    '.' => (),
                    _ => {
                        return Err(format!(
                            "Invalid character '{}' at ({}, {})",
                            c, row, col
                        ));
                    },
                }
            }
        }
        Ok(Self {
            mines,
            width,
            height,
        })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn total_cells(&self) -> usize {
        self.width * self.height
    }

    pub fn mines(&self) -> &HashSet<Coord> {
        &self.mines
    }

    pub fn is_mine(&self, cell: Coord) -> bool {
        self.mines.contains(&cell)
    }

    /// How many of the up-to-8 cells around `cell` are mines
    pub fn nearby_mines(&self, cell: Coord) -> usize {
        neighbours(cell, self.height, self.width)
            .filter(|neighbour| self.mines.contains(neighbour))
            .count()
    }

    /// The game is won once exactly the mines have been flagged
    pub fn won(&self, flags: &HashSet<Coord>) -> bool {
        flags == &self.mines
    }
}

/// How a game played by [`play`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    /// Every clear cell was revealed
    Won,
    /// A random move revealed a mine
    Lost(Coord),
    /// The engine had no move left to make
    Stuck,
}

/// Let `engine` play `board` until the game ends: reveal a proven-safe cell
/// when there is one, otherwise fall back to a random cell.
pub fn play<R: Rng + ?Sized>(
    board: &Board,
    engine: &mut InferenceEngine,
    rng: &mut R,
) -> Result<GameOutcome, KnowledgeError> {
    let clear_cells = all_cells(board.height, board.width)
        .filter(|cell| !board.is_mine(*cell))
        .count();
    info!(
        height = board.height,
        width = board.width,
        mines = board.mines.len(),
        "starting game"
    );
    loop {
        if engine.moves_made().len() == clear_cells {
            info!(
                moves = clear_cells,
                all_flagged = board.won(engine.mines()),
                "game won"
            );
            return Ok(GameOutcome::Won);
        }
        let cell = match engine.make_safe_move() {
            Some(cell) => {
                debug!(?cell, "making safe move");
                cell
            },
            None => {
                match engine.make_random_move(rng) {
                    Some(cell) => {
                        debug!(?cell, "no safe moves left, making random move");
                        cell
                    },
                    None => {
                        info!("no moves left to make");
                        return Ok(GameOutcome::Stuck);
                    },
                }
            },
        };
        if board.is_mine(cell) {
            info!(?cell, "revealed a mine");
            return Ok(GameOutcome::Lost(cell));
        }
        engine.add_knowledge(cell, board.nearby_mines(cell))?;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_mines() {
        let board = Board::new(
            "
            *..
            ..*
            ",
        )
        .unwrap();
        assert_eq!(board.dimensions(), (2, 3));
        assert_eq!(board.total_cells(), 6);
        assert_eq!(board.mines(), &HashSet::from([(0, 0), (1, 2)]));
        assert!(board.is_mine((1, 2)));
        assert!(!board.is_mine((1, 1)));
    }

    #[test]
    fn rejects_bad_boards() {
        assert!(Board::new("").is_err());
        assert!(Board::new("..\n...").is_err());
        assert_eq!(
            Board::new(".x").unwrap_err(),
            "Invalid character 'x' at (0, 1)"
        );
    }

    #[test]
    fn counts_nearby_mines() {
        let board = Board::new("*..\n.*.\n...").unwrap();
        assert_eq!(board.nearby_mines((0, 1)), 2);
        assert_eq!(board.nearby_mines((2, 2)), 1);
        assert_eq!(board.nearby_mines((1, 1)), 1);
        assert_eq!(board.nearby_mines((0, 0)), 1);
    }

    #[test]
    fn won_requires_exact_flags() {
        let board = Board::new("*.\n.*").unwrap();
        assert!(!board.won(&HashSet::from([(0, 0)])));
        assert!(!board.won(&HashSet::from([(0, 0), (1, 1), (0, 1)])));
        assert!(board.won(&HashSet::from([(0, 0), (1, 1)])));
    }
}
