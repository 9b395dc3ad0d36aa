//! Tiled per-cell processing
//!
//! A grid is cut into disjoint rectangular tiles. Each worker owns one tile
//! exclusively while it runs; results are stitched back once all tiles
//! are done.

use crate::strategy::{Executor, ParallelStrategy, ProcessingMode};
use landheat_core::{Error, Mask, Raster, Result};
use ndarray::Array2;

/// Default tile edge length in cells
pub const DEFAULT_TILE_SIZE: usize = 256;

/// A rectangular window of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row offset in the source raster
    pub row_offset: usize,
    /// Column offset in the source raster
    pub col_offset: usize,
    /// Number of rows in this tile
    pub rows: usize,
    /// Number of columns in this tile
    pub cols: usize,
}

impl Tile {
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_offset,
            col_offset,
            rows,
            cols,
        }
    }

    /// Convert tile-local coordinates to source raster coordinates
    pub fn to_source_coords(&self, local_row: usize, local_col: usize) -> (usize, usize) {
        (self.row_offset + local_row, self.col_offset + local_col)
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Iterator over disjoint tiles covering a raster, row-major
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_size: tile_size.max(1),
            current_row: 0,
            current_col: 0,
        }
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let rows = self.tile_size.min(self.total_rows - self.current_row);
        let cols = self.tile_size.min(self.total_cols - self.current_col);
        let tile = Tile::new(self.current_row, self.current_col, rows, cols);

        self.current_col += self.tile_size;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_size;
        }

        Some(tile)
    }
}

/// Runs stateless per-cell kernels over aligned rasters, tile by tile.
///
/// Clones share the executor, including any dedicated thread pool.
#[derive(Debug, Clone)]
pub struct TiledProcessor {
    tile_size: usize,
    mode: ProcessingMode,
    executor: Executor,
}

impl Default for TiledProcessor {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            mode: ProcessingMode::Parallel,
            executor: Executor::Global,
        }
    }
}

impl TiledProcessor {
    /// Fails when `mode` asks for a dedicated pool that cannot be built
    pub fn new(tile_size: usize, mode: ProcessingMode) -> Result<Self> {
        Ok(Self {
            tile_size: tile_size.max(1),
            mode,
            executor: Executor::new(mode)?,
        })
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// Executor for row- or block-parallel work outside `map_cells`
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Apply `kernel` to every cell where all `inputs` are valid.
    ///
    /// The kernel receives the input values in argument order and returns
    /// `None` to mark the output cell as "no value". A cell where any input
    /// is invalid is invalid in the output and the kernel is not called.
    /// The output lies on the grid of the first input.
    pub fn map_cells<F>(&self, inputs: &[&Raster<f64>], kernel: F) -> Result<Raster<f64>>
    where
        F: Fn(&[f64]) -> Option<f64> + Sync + Send,
    {
        let template = *inputs
            .first()
            .ok_or_else(|| Error::Other("map_cells needs at least one input".into()))?;
        for other in &inputs[1..] {
            template.check_aligned(other)?;
        }

        let (rows, cols) = template.shape();
        let tiles: Vec<Tile> = TileIterator::new(rows, cols, self.tile_size).collect();

        let results: Vec<(Vec<f64>, Vec<bool>)> = self.executor.par_map(0..tiles.len(), |i| {
            let tile = tiles[i];
            let mut values = vec![0.0; tile.len()];
            let mut valid = vec![false; tile.len()];
            let mut args = vec![0.0; inputs.len()];

            for local_row in 0..tile.rows {
                'cell: for local_col in 0..tile.cols {
                    let (row, col) = tile.to_source_coords(local_row, local_col);
                    for (slot, input) in args.iter_mut().zip(inputs) {
                        match input.value(row, col) {
                            Some(v) => *slot = v,
                            None => continue 'cell,
                        }
                    }
                    if let Some(out) = kernel(&args) {
                        let idx = local_row * tile.cols + local_col;
                        values[idx] = out;
                        valid[idx] = true;
                    }
                }
            }
            (values, valid)
        })?;

        let mut data = Array2::<f64>::zeros((rows, cols));
        let mut mask = Array2::from_elem((rows, cols), false);
        for (tile, (values, valid)) in tiles.iter().zip(results) {
            for local_row in 0..tile.rows {
                for local_col in 0..tile.cols {
                    let idx = local_row * tile.cols + local_col;
                    let (row, col) = tile.to_source_coords(local_row, local_col);
                    data[(row, col)] = values[idx];
                    mask[(row, col)] = valid[idx];
                }
            }
        }

        template.with_values(data, Mask::from_array(mask))
    }
}
