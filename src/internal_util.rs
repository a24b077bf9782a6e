use itertools::iproduct;

use crate::Coord;

/// Is `(row, col)` on a `height` x `width` grid?
pub(crate) fn in_bounds((row, col): Coord, height: usize, width: usize) -> bool {
    row < height && col < width
}

/// The up-to-8 in-bounds cells surrounding `(row, col)`, not including the
/// cell itself
pub(crate) fn neighbours(
    (row, col): Coord,
    height: usize,
    width: usize,
) -> impl Iterator<Item = Coord> {
    iproduct!(
        row.saturating_sub(1)..=row + 1,
        col.saturating_sub(1)..=col + 1
    )
    .filter(move |&cell| cell != (row, col) && in_bounds(cell, height, width))
}

/// Every cell of a `height` x `width` grid, in row-major order
pub(crate) fn all_cells(height: usize, width: usize) -> impl Iterator<Item = Coord> {
    iproduct!(0..height, 0..width)
}
