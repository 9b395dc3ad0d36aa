//! Evapotranspiration downscaling
//!
//! Redistributes a coarse ET field over the fine grid in proportion to
//! local NDVI relative to its region mean:
//!
//! `ET_fine = ET_coarse * (NDVI / NDVI_regionMean)`

use crate::imagery::{band_math, band_math_binary, BandMathOp};
use crate::resample::resample_nearest;
use landheat_core::raster::Raster;
use landheat_core::{Error, Result};
use landheat_parallel::TiledProcessor;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters for ET downscaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownscaleParams {
    /// Smallest usable `|NDVI_regionMean|`
    pub min_abs_mean: f64,
}

impl Default for DownscaleParams {
    fn default() -> Self {
        Self { min_abs_mean: 1e-6 }
    }
}

/// Downscale `et_coarse` onto the grid of `ndvi`.
///
/// A coarse field on a different grid is first resampled (nearest
/// neighbour). Fails with `DegenerateNormalizer` when the NDVI region mean
/// is not finite or its magnitude is below `params.min_abs_mean`.
pub fn downscale_et(
    et_coarse: &Raster<f64>,
    ndvi: &Raster<f64>,
    ndvi_mean: f64,
    params: &DownscaleParams,
    tiles: &TiledProcessor,
) -> Result<Raster<f64>> {
    if !ndvi_mean.is_finite() || ndvi_mean.abs() < params.min_abs_mean {
        return Err(Error::DegenerateNormalizer {
            name: "NDVI region mean",
            value: ndvi_mean,
            threshold: params.min_abs_mean,
        });
    }

    let resampled;
    let et = if et_coarse.check_aligned(ndvi).is_ok() {
        et_coarse
    } else {
        debug!(
            from = et_coarse.cell_size(),
            to = ndvi.cell_size(),
            "resampling coarse ET onto NDVI grid"
        );
        resampled = resample_nearest(et_coarse, ndvi, tiles)?;
        &resampled
    };

    let ratio = band_math(ndvi, |v| Some(v / ndvi_mean), tiles)?;
    band_math_binary(et, &ratio, BandMathOp::Multiply, tiles)
}
