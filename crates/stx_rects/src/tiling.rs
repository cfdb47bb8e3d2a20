//! Greedy tiling of an occupancy grid into large rectangles.
//!
//! The filled area is consumed largest-rectangle-first: each pass finds the
//! biggest remaining rectangle whose sides are both at least the minimum side
//! length, records it, and clears its cells from a working copy. Optimal
//! decomposition into the fewest rectangles is NP-hard for arbitrary regions;
//! the greedy pass is fast and produces few, blocky rectangles on level
//! geometry. Cells that never fit a rectangle of the minimum size stay untiled.
//!
//! Results are written into a sparse output buffer of `width * height * 2`
//! cells. The pair at a rectangle's upper-left cell holds `(w, h)`; every other
//! pair is zero.

use crate::grid::{GridView, OccupancyGrid};
use crate::histogram::HistogramScanner;
use crate::rect::Rect;

/// Integer type stored in the output buffer. Rectangle sides longer than
/// `MAX_LENGTH` are trimmed to `MAX_LENGTH`; the cut-off part is tiled by a
/// later pass only if it still meets the minimum side length, otherwise it
/// stays untiled.
pub trait OutputCell: Copy + Default + PartialEq + std::fmt::Debug {
    const MAX_LENGTH: usize;

    /// Encodes a side length. Callers keep `length <= MAX_LENGTH`.
    fn from_length(length: usize) -> Self;

    fn to_length(self) -> usize;
}

impl OutputCell for u8 {
    const MAX_LENGTH: usize = u8::MAX as usize;

    fn from_length(length: usize) -> Self {
        length as u8
    }

    fn to_length(self) -> usize {
        self as usize
    }
}

impl OutputCell for u16 {
    const MAX_LENGTH: usize = u16::MAX as usize;

    fn from_length(length: usize) -> Self {
        length as u16
    }

    fn to_length(self) -> usize {
        self as usize
    }
}

impl OutputCell for u32 {
    const MAX_LENGTH: usize = u32::MAX as usize;

    fn from_length(length: usize) -> Self {
        length as u32
    }

    fn to_length(self) -> usize {
        self as usize
    }
}

/// Splits the filled cells of `input` into rectangles and stamps them into
/// `output`. Returns the total area covered by the emitted rectangles.
///
/// `min_side_length` is the smallest width and height a rectangle may have;
/// `1` tiles every filled cell. Values above `O::MAX_LENGTH` tile nothing.
///
/// # Panics
/// If `input` holds fewer than `width * height` cells or `output` fewer than
/// `width * height * 2`.
pub fn find_all<O: OutputCell>(
    input: &[u8],
    width: usize,
    height: usize,
    min_side_length: usize,
    output: &mut [O],
) -> u64 {
    let grid = GridView::new(input, width, height);
    let required = width * height * 2;
    assert!(
        output.len() >= required,
        "output buffer holds {} cells, {}x{} tiling needs {}",
        output.len(),
        width,
        height,
        required
    );
    let output = &mut output[..required];
    output.fill(O::default());

    let min_side = min_side_length.max(1);
    if grid.is_empty() || min_side > O::MAX_LENGTH {
        return 0;
    }

    let mut working = OccupancyGrid::from_view(grid);
    let mut scanner = HistogramScanner::new(width);
    let mut covered = 0u64;
    let mut emitted = 0usize;

    loop {
        let found = scanner.scan(working.view(), min_side);
        if found.is_empty() {
            break;
        }

        // Oversized rects are trimmed; the rest stays filled for a later pass.
        let rect = Rect::new(
            found.x,
            found.y,
            found.w.min(O::MAX_LENGTH),
            found.h.min(O::MAX_LENGTH),
        );
        let origin = (rect.y * width + rect.x) * 2;
        output[origin] = O::from_length(rect.w);
        output[origin + 1] = O::from_length(rect.h);

        working.clear_rect(&rect);
        covered += rect.area() as u64;
        emitted += 1;
    }

    log::debug!(
        "Tiled {}x{} grid into {} rects (min side {}), covered {} of {} filled cells",
        width,
        height,
        emitted,
        min_side,
        covered,
        grid.filled_count()
    );
    covered
}

/// Reads the rectangles back out of a `find_all` output buffer, in row-major
/// order of their origins.
///
/// # Panics
/// If `output` holds fewer than `width * height * 2` cells.
pub fn decode_tiling<O: OutputCell>(output: &[O], width: usize, height: usize) -> Vec<Rect> {
    let required = width * height * 2;
    assert!(
        output.len() >= required,
        "output buffer holds {} cells, {}x{} tiling needs {}",
        output.len(),
        width,
        height,
        required
    );
    output[..required]
        .chunks_exact(2)
        .enumerate()
        .filter_map(|(index, pair)| {
            let (w, h) = (pair[0].to_length(), pair[1].to_length());
            (w != 0 && h != 0).then(|| Rect::new(index % width, index / width, w, h))
        })
        .collect()
}

/// Owned result of [`OccupancyGrid::tile`].
#[derive(Debug, Clone)]
pub struct Tiling<O: OutputCell> {
    buffer: Vec<O>,
    width: usize,
    height: usize,
    covered_area: u64,
}

impl<O: OutputCell> Tiling<O> {
    pub(crate) fn new(buffer: Vec<O>, width: usize, height: usize, covered_area: u64) -> Self {
        Self {
            buffer,
            width,
            height,
            covered_area,
        }
    }

    pub fn rects(&self) -> Vec<Rect> {
        decode_tiling(&self.buffer, self.width, self.height)
    }

    pub fn covered_area(&self) -> u64 {
        self.covered_area
    }

    /// The raw `width * height * 2` encoding.
    pub fn buffer(&self) -> &[O] {
        &self.buffer
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_disjoint(rects: &[Rect]) {
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.intersects(b), "{a} overlaps {b}");
            }
        }
    }

    #[test]
    fn full_grid_is_one_rect() {
        let cells = [1u8; 16];
        let mut output = [0u8; 32];
        let covered = find_all(&cells, 4, 4, 1, &mut output);
        assert_eq!(covered, 16);

        let rects = decode_tiling(&output, 4, 4);
        assert_eq!(rects, vec![Rect::new(0, 0, 4, 4)]);
        assert_eq!(&output[..2], &[4, 4]);
        assert!(output[2..].iter().all(|&cell| cell == 0));
    }

    #[test]
    fn single_column_is_one_rect() {
        let grid = OccupancyGrid::from_cells(vec![1; 5], 1, 5).expect("1x5");
        let tiling = grid.tile::<u8>(1);
        assert_eq!(tiling.covered_area(), 5);
        assert_eq!(tiling.rects(), vec![Rect::new(0, 0, 1, 5)]);
    }

    #[test]
    fn l_shape_splits_into_two_rects() {
        let grid = OccupancyGrid::from_rows(&[[1u8, 1, 1], [1, 1, 1], [1, 0, 0]]).expect("rows");
        let tiling = grid.tile::<u8>(1);
        assert_eq!(tiling.covered_area(), 7);
        assert_eq!(
            tiling.rects(),
            vec![Rect::new(0, 0, 3, 2), Rect::new(0, 2, 1, 1)]
        );
    }

    #[test]
    fn min_side_leaves_slivers_untiled() {
        let grid = OccupancyGrid::from_rows(&[
            [1u8, 1, 1, 0],
            [1, 1, 1, 0],
            [0, 0, 0, 0],
            [1, 1, 1, 1],
        ])
        .expect("rows");
        let tiling = grid.tile::<u8>(2);
        assert_eq!(tiling.covered_area(), 6);
        assert_eq!(tiling.rects(), vec![Rect::new(0, 0, 3, 2)]);
    }

    #[test]
    fn qualifying_rect_is_found_behind_a_bigger_sliver() {
        // The 1x8 strip is the biggest rect but fails min side 2; the 2x2
        // block still gets tiled.
        let mut grid = OccupancyGrid::new(4, 8);
        for y in 0..8 {
            grid.set(0, y, true);
        }
        for (x, y) in Rect::new(2, 3, 2, 2).cells() {
            grid.set(x, y, true);
        }
        let tiling = grid.tile::<u8>(2);
        assert_eq!(tiling.rects(), vec![Rect::new(2, 3, 2, 2)]);
        assert_eq!(tiling.covered_area(), 4);
    }

    #[test]
    fn empty_grid_tiles_nothing() {
        let cells = [0u8; 9];
        let mut output = [7u8; 18];
        assert_eq!(find_all(&cells, 3, 3, 1, &mut output), 0);
        assert!(output.iter().all(|&cell| cell == 0), "stale output cleared");
    }

    #[test]
    fn zero_sized_grid_tiles_nothing() {
        let mut output: [u8; 0] = [];
        assert_eq!(find_all(&[], 0, 3, 1, &mut output), 0);
    }

    #[test]
    fn oversized_rects_are_split_for_narrow_output() {
        let width = 300;
        let grid = OccupancyGrid::from_cells(vec![1; width * 2], width, 2).expect("300x2");

        let narrow = grid.tile::<u8>(1);
        assert_eq!(narrow.covered_area(), 600);
        assert_eq!(
            narrow.rects(),
            vec![Rect::new(0, 0, 255, 2), Rect::new(255, 0, 45, 2)]
        );

        let wide = grid.tile::<u16>(1);
        assert_eq!(wide.rects(), vec![Rect::new(0, 0, 300, 2)]);
    }

    #[test]
    fn trimmed_remainder_below_min_side_stays_untiled() {
        let (width, height) = (300, 50);
        let grid = OccupancyGrid::from_cells(vec![1; width * height], width, height).expect("grid");

        let tiling = grid.tile::<u8>(50);
        assert_eq!(tiling.rects(), vec![Rect::new(0, 0, 255, 50)]);
        assert_eq!(tiling.covered_area(), 255 * 50);
        assert!(tiling.covered_area() < grid.filled_count() as u64);
    }

    #[test]
    fn tiling_buffer_holds_sides_at_origin() {
        let grid = OccupancyGrid::from_rows(&[[0u8, 0, 0], [0, 1, 1], [0, 1, 1]]).expect("rows");
        let tiling = grid.tile::<u16>(1);
        assert_eq!(tiling.width(), 3);
        assert_eq!(tiling.height(), 3);

        let buffer = tiling.buffer();
        assert_eq!(buffer.len(), 3 * 3 * 2);
        let origin = (tiling.width() + 1) * 2;
        assert_eq!(&buffer[origin..origin + 2], &[2, 2]);
        let stamped = buffer.iter().filter(|&&cell| cell != 0).count();
        assert_eq!(stamped, 2);
    }

    #[test]
    fn min_side_above_output_max_tiles_nothing() {
        let grid = OccupancyGrid::from_cells(vec![1; 16], 4, 4).expect("4x4");
        assert_eq!(grid.tile::<u8>(256).covered_area(), 0);
        assert!(grid.tile::<u8>(256).rects().is_empty());
    }

    #[test]
    fn zero_min_side_behaves_like_one() {
        let grid = OccupancyGrid::from_rows(&[[1u8, 0], [0, 1]]).expect("rows");
        assert_eq!(grid.tile::<u8>(0).covered_area(), 2);
        assert_eq!(grid.tile::<u8>(0).rects(), grid.tile::<u8>(1).rects());
    }

    #[test]
    #[should_panic(expected = "output buffer holds")]
    fn short_output_buffer_panics() {
        let cells = [1u8; 4];
        let mut output = [0u8; 7];
        find_all(&cells, 2, 2, 1, &mut output);
    }

    #[test]
    fn random_tilings_conserve_area_and_do_not_overlap() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let width = rng.gen_range(1..=12);
            let height = rng.gen_range(1..=12);
            let cells: Vec<u8> = (0..width * height)
                .map(|_| u8::from(rng.gen_bool(0.7)))
                .collect();
            let grid = OccupancyGrid::from_cells(cells, width, height).expect("cells");
            let min_side = rng.gen_range(1..=3);

            let tiling = grid.tile::<u8>(min_side);
            let rects = tiling.rects();
            assert_disjoint(&rects);

            let mut leftover = grid.clone();
            for rect in &rects {
                assert!(rect.w >= min_side && rect.h >= min_side);
                assert!(grid.view().rect_is_filled(rect), "{rect} covers empty cells");
                leftover.clear_rect(rect);
            }

            let emitted: u64 = rects.iter().map(|r| r.area() as u64).sum();
            assert_eq!(emitted, tiling.covered_area());
            assert_eq!(
                emitted + leftover.filled_count() as u64,
                grid.filled_count() as u64
            );
            assert!(find_biggest_with_min_side_is_empty(&leftover, min_side));
            if min_side == 1 {
                assert_eq!(leftover.filled_count(), 0);
            }
        }
    }

    fn find_biggest_with_min_side_is_empty(grid: &OccupancyGrid, min_side: usize) -> bool {
        crate::histogram::find_biggest_with_min_side(grid.view(), min_side).is_empty()
    }
}
