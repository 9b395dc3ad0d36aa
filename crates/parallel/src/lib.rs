//! # landheat parallel
//!
//! Parallel execution for per-cell raster stages.
//!
//! This crate provides:
//! - `ProcessingMode`: sequential, global-pool or dedicated-pool execution
//! - `Executor`: a mode resolved once, holding its dedicated pool
//! - Disjoint tile decomposition of a grid
//! - `TiledProcessor::map_cells`, the tile-parallel per-cell kernel engine

pub mod strategy;
pub mod tiled;

pub use strategy::{num_threads, Executor, ParallelStrategy, ProcessingMode};
pub use tiled::{DEFAULT_TILE_SIZE, Tile, TileIterator, TiledProcessor};
