//! Collision underlay: grid-based solids merged into a small set of boxes.
//!
//! Levels author collision as individual solid tiles. Gameplay queries are
//! cheaper against a handful of large rectangles than against hundreds of
//! cells, so [`CollisionGrid::merge_solids`] runs the greedy rectangle tiling
//! over the solid cells and converts the result to world-space boxes.
//!
//! The collision file's y axis grows upward (cell `y = 0` is the bottom row),
//! while occupancy grids grow downward. Conversion flips rows once, here.

mod collision;

pub use collision::{
    load_collision_from_path, CollisionFile, CollisionGrid, CollisionRect, GridCell, GridOrigin,
    MergedCollision,
};
