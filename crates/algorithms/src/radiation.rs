//! Solar radiation proxy
//!
//! `SolarRadiation = Albedo * S0` with `S0` the solar constant. This scales
//! albedo into W/m² units only: solar zenith angle, atmospheric
//! transmittance and Earth-Sun distance are ignored.

use crate::imagery::band_math;
use landheat_core::Result;
use landheat_core::raster::Raster;
use landheat_parallel::TiledProcessor;

/// Top-of-atmosphere irradiance, W/m²
pub const SOLAR_CONSTANT: f64 = 1367.0;

/// Solar radiation proxy from an albedo field
pub fn solar_radiation(albedo: &Raster<f64>, tiles: &TiledProcessor) -> Result<Raster<f64>> {
    band_math(albedo, |a| Some(a * SOLAR_CONSTANT), tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solar_radiation() {
        let mut albedo = Raster::filled(3, 3, 0.25);
        albedo.set_invalid(0, 0);
        let out = solar_radiation(&albedo, &TiledProcessor::default()).unwrap();
        assert_relative_eq!(out.value(1, 1).unwrap(), 341.75, epsilon = 1e-10);
        assert_eq!(out.value(0, 0), None);
    }
}
