//! Rectangle decomposition of tile occupancy grids.
//!
//! Static level geometry is authored tile by tile, but collision and batching
//! want as few boxes as possible. This crate answers two questions about a
//! binary occupancy grid:
//!
//!  1. **What is the largest all-filled rectangle?** -- [`find_biggest`]
//!  2. **How can the filled area be tiled greedily into big rectangles?** --
//!     [`find_all`] / [`OccupancyGrid::tile`]
//!
//! Everything here is a pure function of caller-owned buffers. Nothing is
//! cached between calls, so independent grids can be processed from any
//! number of threads.

pub mod grid;
pub mod histogram;
pub mod rect;
pub mod tiling;

pub use grid::{GridView, OccupancyGrid};
pub use histogram::{find_biggest, find_biggest_in, find_biggest_with_min_side};
pub use rect::Rect;
pub use tiling::{decode_tiling, find_all, OutputCell, Tiling};
