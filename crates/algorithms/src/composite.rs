//! Temporal compositing
//!
//! Reduces a stack of co-registered observations to one value per cell,
//! using only the observations that are valid at that cell.

use landheat_core::raster::Raster;
use landheat_core::{BandStack, Error, Mask, Result, SceneSeries};
use landheat_parallel::{Executor, ParallelStrategy, TiledProcessor};
use ndarray::Array2;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Per-cell median over the scenes of a series.
///
/// Each band is reduced independently over the scenes where the cell is
/// valid in both the band and the scene's stack mask; an even number of
/// observations yields the mean of the two middle values. Cells without
/// any observation have no value. The composite's stack mask is the AND of
/// its band masks and `clip`.
///
/// Fails with `NoValidObservations` if no cell of the clipped composite
/// holds a value.
pub fn median_composite(
    series: &SceneSeries,
    clip: Option<&Mask>,
    tiles: &TiledProcessor,
) -> Result<BandStack> {
    let mut bands = BTreeMap::new();

    for band in series.band_names() {
        let observations = series
            .iter()
            .map(|scene| scene.stack.band(band)?.masked(scene.stack.mask()))
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<&Raster<f64>> = observations.iter().collect();

        let composite = reduce_observations(&refs, tiles.executor(), median)?;
        debug!(band = %band, valid = composite.valid_count(), "median composite band");
        bands.insert(band, composite);
    }

    let mut stack = BandStack::new(bands)?;
    if let Some(clip) = clip {
        stack = stack.with_mask(clip)?;
    }

    if stack.mask().is_empty() {
        return Err(Error::NoValidObservations(format!(
            "median composite of {} scenes has no valid cell",
            series.len()
        )));
    }
    info!(
        scenes = series.len(),
        valid = stack.mask().count_valid(),
        "built median composite"
    );
    Ok(stack)
}

/// Per-cell mean of aligned rasters over their valid observations.
///
/// Fails with `NoValidObservations` when `rasters` is empty or no cell has
/// an observation.
pub fn mean_composite(rasters: &[Raster<f64>], tiles: &TiledProcessor) -> Result<Raster<f64>> {
    if rasters.is_empty() {
        return Err(Error::NoValidObservations(
            "mean composite of an empty collection".into(),
        ));
    }
    let refs: Vec<&Raster<f64>> = rasters.iter().collect();
    let composite = reduce_observations(&refs, tiles.executor(), mean)?;
    if composite.valid_count() == 0 {
        return Err(Error::NoValidObservations(format!(
            "mean composite of {} rasters has no valid cell",
            rasters.len()
        )));
    }
    debug!(
        rasters = rasters.len(),
        valid = composite.valid_count(),
        "built mean composite"
    );
    Ok(composite)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 0 {
        Some((values[n / 2 - 1] + values[n / 2]) / 2.0)
    } else {
        Some(values[n / 2])
    }
}

fn mean(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Row-parallel reduction of the valid observations at each cell
fn reduce_observations<F>(
    inputs: &[&Raster<f64>],
    executor: &Executor,
    reduce: F,
) -> Result<Raster<f64>>
where
    F: Fn(&mut [f64]) -> Option<f64> + Sync + Send,
{
    let template = *inputs
        .first()
        .ok_or_else(|| Error::NoValidObservations("nothing to composite".into()))?;
    for other in &inputs[1..] {
        template.check_aligned(other)?;
    }
    let (rows, cols) = template.shape();

    let row_results: Vec<(Vec<f64>, Vec<bool>)> = executor.par_map(0..rows, |row| {
        let mut row_data = vec![0.0; cols];
        let mut row_mask = vec![false; cols];
        let mut observed = Vec::with_capacity(inputs.len());
        for col in 0..cols {
            observed.clear();
            observed.extend(inputs.iter().filter_map(|r| r.value(row, col)));
            if let Some(v) = reduce(observed.as_mut_slice()) {
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
    template.with_values(data, mask)
}
