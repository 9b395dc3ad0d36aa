//! Land surface temperature retrieval
//!
//! Single-channel inversion of brightness temperature with an emissivity
//! correction:
//!
//! `LST = Tb / (1 + (λ * Tb / ρ) * ln(ε)) - 273.15`
//!
//! where `λ` is the effective wavelength of the thermal band (µm) and
//! `ρ = h * c / σ` (µm K). The result is in °C.

use crate::imagery::band_math;
use landheat_core::Result;
use landheat_core::raster::Raster;
use landheat_parallel::TiledProcessor;

/// Effective wavelength of the emitted radiance, µm
pub const WAVELENGTH_UM: f64 = 11.5;
/// `h * c / σ`, µm K
pub const RHO: f64 = 14380.0;
/// Kelvin to Celsius offset
pub const KELVIN_OFFSET: f64 = 273.15;

/// Emissivity heuristic from albedo: `ε = (albedo + 0.95) / 2`
pub fn emissivity_from_albedo(albedo: &Raster<f64>, tiles: &TiledProcessor) -> Result<Raster<f64>> {
    band_math(albedo, |a| Some((a + 0.95) / 2.0), tiles)
}

/// LST in °C for one cell; `None` when `ε <= 0` or the result is not finite
#[inline]
pub fn lst_celsius(brightness_temperature: f64, emissivity: f64) -> Option<f64> {
    if emissivity <= 0.0 {
        return None;
    }
    let tb = brightness_temperature;
    let lst = tb / (1.0 + (WAVELENGTH_UM * tb / RHO) * emissivity.ln()) - KELVIN_OFFSET;
    lst.is_finite().then_some(lst)
}

/// Land surface temperature (°C) from brightness temperature (K) and
/// emissivity.
pub fn land_surface_temperature(
    brightness_temperature: &Raster<f64>,
    emissivity: &Raster<f64>,
    tiles: &TiledProcessor,
) -> Result<Raster<f64>> {
    tiles.map_cells(&[brightness_temperature, emissivity], |v| {
        lst_celsius(v[0], v[1])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lst_reference_value() {
        let expected = 300.0 / (1.0 + (11.5 * 300.0 / 14380.0) * 0.98f64.ln()) - 273.15;
        let lst = lst_celsius(300.0, 0.98).unwrap();
        assert_relative_eq!(lst, expected, epsilon = 1e-12);
        // ≈ 28.31 °C
        assert!((lst - 28.311).abs() < 0.01);
    }

    #[test]
    fn test_unit_emissivity_is_brightness_temperature() {
        assert_relative_eq!(lst_celsius(300.0, 1.0).unwrap(), 26.85, epsilon = 1e-10);
    }

    #[test]
    fn test_non_positive_emissivity() {
        assert_eq!(lst_celsius(300.0, 0.0), None);
        assert_eq!(lst_celsius(300.0, -0.1), None);
    }

    #[test]
    fn test_emissivity_from_albedo() {
        let albedo = Raster::filled(2, 2, 0.15);
        let e = emissivity_from_albedo(&albedo, &TiledProcessor::default()).unwrap();
        assert_relative_eq!(e.value(0, 0).unwrap(), 0.55, epsilon = 1e-12);
    }

    #[test]
    fn test_land_surface_temperature_raster() {
        let tb = Raster::filled(3, 3, 300.0);
        let mut eps = Raster::filled(3, 3, 0.98);
        eps.set(1, 1, -0.5).unwrap();
        eps.set_invalid(2, 2);

        let lst = land_surface_temperature(&tb, &eps, &TiledProcessor::default()).unwrap();
        assert_relative_eq!(
            lst.value(0, 0).unwrap(),
            lst_celsius(300.0, 0.98).unwrap(),
            epsilon = 1e-12
        );
        assert_eq!(lst.value(1, 1), None);
        assert_eq!(lst.value(2, 2), None);
    }
}
