//! Nearest-neighbour resampling onto another grid
//!
//! Used to bring the coarse ET product onto the 30 m analysis grid before
//! downscaling.

use landheat_core::raster::{Raster, RasterElement};
use landheat_core::{Error, Mask, Result};
use landheat_parallel::{ParallelStrategy, TiledProcessor};
use ndarray::Array2;
use tracing::debug;

/// Resample `source` onto the grid of `target` (transform, shape and CRS).
///
/// Each target cell takes the source cell containing its centre. Target
/// cells whose centre lies outside the source, or on an invalid source
/// cell, have no value. Both grids must share a CRS when both declare one.
pub fn resample_nearest<T: RasterElement>(
    source: &Raster<f64>,
    target: &Raster<T>,
    tiles: &TiledProcessor,
) -> Result<Raster<f64>> {
    if let (Some(src), Some(dst)) = (source.crs(), target.crs())
        && !src.is_equivalent(dst)
    {
        return Err(Error::CrsMismatch(src.to_string(), dst.to_string()));
    }

    let (rows, cols) = target.shape();
    let (src_rows, src_cols) = source.shape();

    let row_results: Vec<(Vec<f64>, Vec<bool>)> = tiles.executor().par_map(0..rows, |row| {
        let mut row_data = vec![0.0; cols];
        let mut row_mask = vec![false; cols];
        for col in 0..cols {
            let (x, y) = target.pixel_to_geo(col, row);
            let (sc, sr) = source.geo_to_pixel(x, y);
            if !sc.is_finite() || !sr.is_finite() || sc < 0.0 || sr < 0.0 {
                continue;
            }
            let (sc, sr) = (sc.floor() as usize, sr.floor() as usize);
            if sc >= src_cols || sr >= src_rows {
                continue;
            }
            if let Some(v) = source.value(sr, sc) {
                row_data[col] = v;
                row_mask[col] = true;
            }
        }
        (row_data, row_mask)
    })?;

    let (data, valid): (Vec<Vec<f64>>, Vec<Vec<bool>>) = row_results.into_iter().unzip();
    let data = Array2::from_shape_vec((rows, cols), data.concat())
        .map_err(|e| Error::Other(e.to_string()))?;
    let mask = Mask::from_vec(valid.concat(), rows, cols)?;

    debug!(
        source_cell = source.cell_size(),
        target_cell = target.cell_size(),
        valid = mask.count_valid(),
        "nearest-neighbour resample"
    );
    target.with_values(data, mask)
}
