use glam::Vec2;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use stx_rects::{OccupancyGrid, Rect};

#[derive(Debug, Deserialize, Clone)]
pub struct CollisionFile {
    pub version: String,
    pub collision_id: String,
    pub cell_size: i32,
    #[serde(default)]
    pub origin: GridOrigin,
    pub width: i32,
    pub height: i32,
    pub solids: Vec<GridCell>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct GridOrigin {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone)]
pub struct CollisionGrid {
    pub version: String,
    pub collision_id: String,
    pub cell_size: i32,
    pub origin: GridOrigin,
    pub width: i32,
    pub height: i32,
    solids: HashSet<GridCell>,
}

/// A merged block of solid cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRect {
    /// Cell rectangle in occupancy-grid space (row 0 is the top row).
    pub cells: Rect,
    /// World-space lower-left corner.
    pub min: Vec2,
    /// World-space upper-right corner.
    pub max: Vec2,
}

impl CollisionRect {
    pub fn overlaps(&self, min: Vec2, max: Vec2) -> bool {
        self.min.x < max.x && min.x < self.max.x && self.min.y < max.y && min.y < self.max.y
    }
}

/// Every solid cell of a [`CollisionGrid`], covered exactly once.
#[derive(Debug, Clone)]
pub struct MergedCollision {
    pub min_side_length: usize,
    pub rects: Vec<CollisionRect>,
    /// How many of `rects` are single leftover cells that did not fit a block
    /// of `min_side_length`.
    pub leftover_cells: usize,
}

impl MergedCollision {
    pub fn solid_area(&self) -> usize {
        self.rects.iter().map(|rect| rect.cells.area()).sum()
    }

    /// Rects overlapping the world-space box `min..max`.
    pub fn query_aabb(&self, min: Vec2, max: Vec2) -> impl Iterator<Item = &CollisionRect> {
        self.rects.iter().filter(move |rect| rect.overlaps(min, max))
    }
}

impl CollisionGrid {
    pub fn from_file(file: CollisionFile) -> Self {
        let solids = file.solids.into_iter().collect();
        Self {
            version: file.version,
            collision_id: file.collision_id,
            cell_size: file.cell_size,
            origin: file.origin,
            width: file.width,
            height: file.height,
            solids,
        }
    }

    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return false;
        }
        self.solids.contains(&GridCell { x, y })
    }

    pub fn solids_iter(&self) -> impl Iterator<Item = &GridCell> {
        self.solids.iter()
    }

    pub fn solid_count(&self) -> usize {
        self.solids.len()
    }

    /// Solid cells as an occupancy grid, rows flipped so row 0 is the top.
    pub fn occupancy(&self) -> OccupancyGrid {
        let width = self.width.max(0) as usize;
        let height = self.height.max(0) as usize;
        let mut grid = OccupancyGrid::new(width, height);
        for cell in self.solids_iter() {
            grid.set(cell.x as usize, self.flip_row(cell.y), true);
        }
        grid
    }

    /// Merges solids into blocks whose sides are at least `min_side_length`
    /// cells; whatever remains is appended as 1x1 rects.
    pub fn merge_solids(&self, min_side_length: usize) -> MergedCollision {
        let occupancy = self.occupancy();
        let tiling = occupancy.tile::<u16>(min_side_length);

        let mut leftover = occupancy.clone();
        let mut rects = Vec::new();
        for cells in tiling.rects() {
            leftover.clear_rect(&cells);
            rects.push(self.collision_rect(cells));
        }

        let merged_blocks = rects.len();
        for y in 0..leftover.height() {
            for x in 0..leftover.width() {
                if leftover.is_filled(x, y) {
                    rects.push(self.collision_rect(Rect::new(x, y, 1, 1)));
                }
            }
        }
        let leftover_cells = rects.len() - merged_blocks;

        log::debug!(
            "Collision '{}': merged {} solids into {} blocks + {} single cells",
            self.collision_id,
            self.solids.len(),
            merged_blocks,
            leftover_cells
        );

        MergedCollision {
            min_side_length,
            rects,
            leftover_cells,
        }
    }

    fn collision_rect(&self, cells: Rect) -> CollisionRect {
        let cell_size = self.cell_size as f32;
        // Lowest file-space row covered by this rect.
        let bottom_y = self.height as usize - cells.bottom();
        let min = Vec2::new(
            self.origin.x as f32 + (cells.x as f32) * cell_size,
            self.origin.y as f32 + (bottom_y as f32) * cell_size,
        );
        let max = min + Vec2::new(cells.w as f32, cells.h as f32) * cell_size;
        CollisionRect { cells, min, max }
    }

    fn flip_row(&self, y: i32) -> usize {
        (self.height - 1 - y) as usize
    }
}

pub fn load_collision_from_path(path: &Path) -> Result<CollisionGrid, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let file: CollisionFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse collision JSON {}: {e}", path.display()))?;
    validate_collision_file(&file)?;
    if file.solids.is_empty() {
        log::warn!(
            "Collision '{}' has no solid cells. This is allowed but often accidental.",
            file.collision_id
        );
    }
    Ok(CollisionGrid::from_file(file))
}

fn validate_collision_file(file: &CollisionFile) -> Result<(), String> {
    if file.cell_size <= 0 {
        return Err("Collision validation failed: cell_size must be > 0".to_string());
    }
    if file.width <= 0 || file.height <= 0 {
        return Err("Collision validation failed: width and height must be > 0".to_string());
    }

    let mut seen = HashSet::new();
    for cell in &file.solids {
        if cell.x < 0 || cell.x >= file.width || cell.y < 0 || cell.y >= file.height {
            return Err(format!(
                "Collision validation failed: solid cell out of bounds ({}, {})",
                cell.x, cell.y
            ));
        }
        if !seen.insert(*cell) {
            return Err(format!(
                "Collision validation failed: duplicate solid cell ({}, {})",
                cell.x, cell.y
            ));
        }
    }
    Ok(())
}
