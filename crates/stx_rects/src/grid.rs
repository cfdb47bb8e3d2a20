use crate::rect::Rect;
use crate::tiling::{self, OutputCell, Tiling};

/// Borrowed row-major occupancy grid. `0` is empty, any other value is filled.
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    cells: &'a [u8],
    width: usize,
    height: usize,
}

impl<'a> GridView<'a> {
    /// Wraps a caller-owned buffer.
    ///
    /// # Panics
    /// If `cells` holds fewer than `width * height` elements.
    pub fn new(cells: &'a [u8], width: usize, height: usize) -> Self {
        let required = width
            .checked_mul(height)
            .expect("grid dimensions overflow usize");
        assert!(
            cells.len() >= required,
            "grid buffer holds {} cells, {}x{} needs {}",
            cells.len(),
            width,
            height,
            required
        );
        Self {
            cells: &cells[..required],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn is_filled(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.cells[y * self.width + x] != 0
    }

    pub fn row(&self, y: usize) -> &'a [u8] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell != 0).count()
    }

    /// True when `rect` is in bounds and every cell under it is filled.
    pub fn rect_is_filled(&self, rect: &Rect) -> bool {
        rect.right() <= self.width
            && rect.bottom() <= self.height
            && rect.cells().all(|(x, y)| self.is_filled(x, y))
    }
}

/// Owned occupancy grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyGrid {
    cells: Vec<u8>,
    width: usize,
    height: usize,
}

impl OccupancyGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![0; width * height],
            width,
            height,
        }
    }

    pub fn from_cells(cells: Vec<u8>, width: usize, height: usize) -> Result<Self, String> {
        if width.checked_mul(height) != Some(cells.len()) {
            return Err(format!(
                "Grid validation failed: {} cells do not form a {}x{} grid",
                cells.len(),
                width,
                height
            ));
        }
        Ok(Self {
            cells,
            width,
            height,
        })
    }

    /// Builds a grid from equally long rows, top row first.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self, String> {
        let width = rows.first().map_or(0, |row| row.as_ref().len());
        let mut cells = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                return Err(format!(
                    "Grid validation failed: row {} has {} cells, expected {}",
                    y,
                    row.len(),
                    width
                ));
            }
            cells.extend_from_slice(row);
        }
        Ok(Self {
            cells,
            width,
            height: rows.len(),
        })
    }

    pub fn from_view(view: GridView<'_>) -> Self {
        Self {
            cells: view.cells.to_vec(),
            width: view.width,
            height: view.height,
        }
    }

    pub fn view(&self) -> GridView<'_> {
        GridView {
            cells: &self.cells,
            width: self.width,
            height: self.height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn is_filled(&self, x: usize, y: usize) -> bool {
        self.view().is_filled(x, y)
    }

    pub fn filled_count(&self) -> usize {
        self.view().filled_count()
    }

    /// Sets one cell. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, filled: bool) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = u8::from(filled);
        }
    }

    /// Marks every cell under `rect` empty, clipped to the grid.
    pub fn clear_rect(&mut self, rect: &Rect) {
        let right = rect.right().min(self.width);
        let bottom = rect.bottom().min(self.height);
        for y in rect.y..bottom {
            let row = y * self.width;
            self.cells[row + rect.x.min(right)..row + right].fill(0);
        }
    }

    pub fn find_biggest(&self) -> Rect {
        crate::histogram::find_biggest(self.view())
    }

    /// Greedily tiles the filled area; see [`tiling::find_all`].
    pub fn tile<O: OutputCell>(&self, min_side_length: usize) -> Tiling<O> {
        let mut buffer = vec![O::default(); self.width * self.height * 2];
        let covered_area = tiling::find_all(
            &self.cells,
            self.width,
            self.height,
            min_side_length,
            &mut buffer,
        );
        Tiling::new(buffer, self.width, self.height, covered_area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_builds_row_major_grid() {
        let grid = OccupancyGrid::from_rows(&[[1u8, 0, 0], [0, 0, 7]]).expect("valid rows");
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert!(grid.is_filled(0, 0));
        assert!(grid.is_filled(2, 1));
        assert!(!grid.is_filled(1, 0));
        assert_eq!(grid.filled_count(), 2);
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let rows: Vec<Vec<u8>> = vec![vec![1, 1], vec![1]];
        let err = OccupancyGrid::from_rows(&rows).expect_err("ragged rows should fail");
        assert!(err.contains("row 1"));
    }

    #[test]
    fn from_cells_rejects_wrong_length() {
        let err = OccupancyGrid::from_cells(vec![1; 5], 2, 3).expect_err("5 cells is not 2x3");
        assert!(err.contains("2x3"));
    }

    #[test]
    fn out_of_bounds_reads_are_empty() {
        let grid = OccupancyGrid::from_rows(&[[1u8, 1]]).expect("valid rows");
        assert!(!grid.is_filled(2, 0));
        assert!(!grid.is_filled(0, 1));
    }

    #[test]
    fn clear_rect_empties_only_covered_cells() {
        let mut grid =
            OccupancyGrid::from_rows(&[[1u8, 1, 1], [1, 1, 1], [1, 1, 1]]).expect("valid rows");
        grid.clear_rect(&Rect::new(1, 1, 5, 5));
        assert_eq!(grid.cells(), &[1, 1, 1, 1, 0, 0, 1, 0, 0]);
    }

    #[test]
    fn set_ignores_out_of_bounds() {
        let mut grid = OccupancyGrid::new(2, 2);
        grid.set(1, 1, true);
        grid.set(2, 0, true);
        assert_eq!(grid.filled_count(), 1);
    }

    #[test]
    fn view_rect_is_filled_checks_bounds_and_cells() {
        let grid = OccupancyGrid::from_rows(&[[1u8, 1, 0], [1, 1, 0]]).expect("rows");
        let view = grid.view();
        assert!(view.rect_is_filled(&Rect::new(0, 0, 2, 2)));
        assert!(!view.rect_is_filled(&Rect::new(1, 0, 2, 2)));
        assert!(!view.rect_is_filled(&Rect::new(0, 1, 1, 2)));
    }

    #[test]
    #[should_panic(expected = "grid buffer holds")]
    fn view_panics_on_short_buffer() {
        let cells = [1u8; 3];
        let _ = GridView::new(&cells, 2, 2);
    }
}
