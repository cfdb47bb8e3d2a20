//! Largest all-filled rectangle search.
//!
//! The grid is swept top to bottom while a per-column **height** array tracks
//! how many consecutive filled cells end at the current row. Each row then
//! becomes a histogram, and the largest rectangle under that histogram is
//! found with a monotonic stack of column indices:
//!
//!  - bars are pushed while heights are non-decreasing
//!  - a shorter bar pops every strictly taller bar; the popped bar spans from
//!    just after the bar beneath it on the stack up to the current column
//!
//! Every maximal rectangle of the grid is evaluated as some popped bar, so the
//! sweep is exact. Each column is pushed and popped once per row, giving
//! O(width * height) time and O(width) scratch space.
//!
//! Ties resolve to the first rectangle of strictly greater area in scan order
//! (rows top to bottom, then pop order within a row), so results are stable
//! for a given grid.

use crate::grid::GridView;
use crate::rect::Rect;

/// Returns the largest rectangle made only of filled cells.
///
/// A grid with no filled cells (or zero width/height) yields `(0, 0, 0, 0)`.
pub fn find_biggest(grid: GridView<'_>) -> Rect {
    find_biggest_with_min_side(grid, 1)
}

/// [`find_biggest`] over a raw row-major buffer.
///
/// # Panics
/// If `data` holds fewer than `width * height` cells.
pub fn find_biggest_in(data: &[u8], width: usize, height: usize) -> Rect {
    find_biggest(GridView::new(data, width, height))
}

/// Largest filled rectangle whose width and height are both at least
/// `min_side`. Returns a zero-area rect when none qualifies.
pub fn find_biggest_with_min_side(grid: GridView<'_>, min_side: usize) -> Rect {
    HistogramScanner::new(grid.width()).scan(grid, min_side)
}

/// Scratch buffers for the sweep, reusable across repeated searches on grids
/// of the same width.
pub(crate) struct HistogramScanner {
    heights: Vec<usize>,
    stack: Vec<usize>,
}

impl HistogramScanner {
    pub(crate) fn new(width: usize) -> Self {
        Self {
            heights: Vec::with_capacity(width),
            stack: Vec::with_capacity(width + 1),
        }
    }

    pub(crate) fn scan(&mut self, grid: GridView<'_>, min_side: usize) -> Rect {
        let mut best = Rect::default();
        if grid.is_empty() {
            return best;
        }

        let min_side = min_side.max(1);
        if min_side > grid.width() || min_side > grid.height() {
            return best;
        }

        self.heights.clear();
        self.heights.resize(grid.width(), 0);

        for y in 0..grid.height() {
            for (height, &cell) in self.heights.iter_mut().zip(grid.row(y)) {
                *height = if cell != 0 { *height + 1 } else { 0 };
            }
            self.scan_row(y, min_side, &mut best);
        }

        best
    }

    fn scan_row(&mut self, y: usize, min_side: usize, best: &mut Rect) {
        let width = self.heights.len();
        self.stack.clear();

        // Column `width` acts as a zero-height sentinel that drains the stack.
        for column in 0..=width {
            let current = self.heights.get(column).copied().unwrap_or(0);
            while let Some(&top) = self.stack.last() {
                let bar = self.heights[top];
                if bar <= current {
                    break;
                }
                self.stack.pop();

                let left = self.stack.last().map_or(0, |&below| below + 1);
                let span = column - left;
                if span >= min_side && bar >= min_side && span * bar > best.area() {
                    *best = Rect::new(left, y + 1 - bar, span, bar);
                }
            }
            if column < width {
                self.stack.push(column);
            }
        }
    }
}
