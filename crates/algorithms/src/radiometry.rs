//! Radiometric scaling
//!
//! Converts Landsat Collection-2 Level-2 digital numbers into surface
//! reflectance (optical bands) and brightness temperature in kelvin
//! (thermal band).

use crate::imagery::band_math;
use landheat_core::{BandGroup, BandStack, Raster, Result};
use landheat_parallel::TiledProcessor;
use tracing::{debug, warn};

/// Affine scaling `value * gain + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub gain: f64,
    pub offset: f64,
}

impl ScaleFactors {
    /// Collection-2 surface reflectance
    pub const OPTICAL: ScaleFactors = ScaleFactors {
        gain: 0.0000275,
        offset: -0.2,
    };

    /// Collection-2 surface temperature, kelvin
    pub const THERMAL: ScaleFactors = ScaleFactors {
        gain: 0.00341802,
        offset: 149.0,
    };

    /// Factors for a band group; quality bands are not scaled
    pub fn for_group(group: BandGroup) -> Option<ScaleFactors> {
        match group {
            BandGroup::Optical => Some(Self::OPTICAL),
            BandGroup::Thermal => Some(Self::THERMAL),
            BandGroup::Quality => None,
        }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.gain + self.offset
    }
}

/// Plausible range of scaled optical reflectance
const OPTICAL_PLAUSIBLE: (f64, f64) = (-1.0, 2.0);

/// Scale every optical and thermal band of a raw stack.
///
/// The quality band passes through unchanged. Optical results outside
/// `[-1, 2]` are kept but reported with one warning per band.
pub fn apply_scale_factors(stack: &BandStack, tiles: &TiledProcessor) -> Result<BandStack> {
    stack.map_bands(|band, raster| {
        let Some(factors) = ScaleFactors::for_group(band.group()) else {
            return Ok(raster.clone());
        };
        let scaled = band_math(raster, |v| Some(factors.apply(v)), tiles)?;

        if band.group() == BandGroup::Optical {
            let outside = count_outside(&scaled, OPTICAL_PLAUSIBLE);
            if outside > 0 {
                warn!(
                    band = %band,
                    cells = outside,
                    "scaled reflectance outside [{}, {}]",
                    OPTICAL_PLAUSIBLE.0,
                    OPTICAL_PLAUSIBLE.1
                );
            }
        }
        debug!(band = %band, valid = scaled.valid_count(), "scaled band");
        Ok(scaled)
    })
}

fn count_outside(raster: &Raster<f64>, (lo, hi): (f64, f64)) -> usize {
    raster
        .data()
        .iter()
        .zip(raster.mask().as_array().iter())
        .filter(|&(&v, &valid)| valid && (v < lo || v > hi))
        .count()
}
