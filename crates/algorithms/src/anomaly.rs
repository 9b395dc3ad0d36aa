//! Thermal anomaly indices
//!
//! - UHI: LST z-score against the region mean and standard deviation
//! - UTFVI: `(LST - LST_mean) / LST`

use crate::imagery::band_math;
use crate::thermal::KELVIN_OFFSET;
use landheat_core::raster::Raster;
use landheat_core::{Error, Result};
use landheat_parallel::TiledProcessor;
use serde::{Deserialize, Serialize};

/// Temperature scale UTFVI divides by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtfviBasis {
    /// LST in °C; a cell with `LST == 0` has no value
    #[default]
    Celsius,
    /// LST shifted to kelvin before the ratio
    Kelvin,
}

/// Parameters for the anomaly indices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyParams {
    /// Smallest usable LST region standard deviation
    pub min_std: f64,
    pub utfvi_basis: UtfviBasis,
}

impl Default for AnomalyParams {
    fn default() -> Self {
        Self {
            min_std: 1e-9,
            utfvi_basis: UtfviBasis::default(),
        }
    }
}

/// Urban heat island: `(LST - mean) / std_dev`.
///
/// Fails with `DegenerateNormalizer` when `std_dev` is not finite or below
/// `params.min_std`.
pub fn urban_heat_island(
    lst: &Raster<f64>,
    mean: f64,
    std_dev: f64,
    params: &AnomalyParams,
    tiles: &TiledProcessor,
) -> Result<Raster<f64>> {
    if !std_dev.is_finite() || std_dev < params.min_std {
        return Err(Error::DegenerateNormalizer {
            name: "LST region standard deviation",
            value: std_dev,
            threshold: params.min_std,
        });
    }
    band_math(lst, |t| Some((t - mean) / std_dev), tiles)
}

/// Urban thermal field variance index: `(LST - mean) / LST`.
///
/// The division is per cell; a zero denominator yields "no value" rather
/// than an error.
pub fn urban_thermal_field_variance(
    lst: &Raster<f64>,
    mean: f64,
    params: &AnomalyParams,
    tiles: &TiledProcessor,
) -> Result<Raster<f64>> {
    let shift = match params.utfvi_basis {
        UtfviBasis::Celsius => 0.0,
        UtfviBasis::Kelvin => KELVIN_OFFSET,
    };
    band_math(
        lst,
        |t| {
            let denom = t + shift;
            if denom == 0.0 {
                return None;
            }
            Some((t - mean) / denom)
        },
        tiles,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uhi_zscore() {
        let lst = Raster::from_vec(vec![30.0, 32.0, 34.0, 36.0], 2, 2).unwrap();
        let out = urban_heat_island(&lst, 33.0, 2.0, &AnomalyParams::default(), &TiledProcessor::default())
            .unwrap();
        assert_relative_eq!(out.value(0, 0).unwrap(), -1.5);
        assert_relative_eq!(out.value(1, 1).unwrap(), 1.5);
    }

    #[test]
    fn test_uhi_degenerate_std() {
        let lst = Raster::filled(2, 2, 30.0);
        for std in [0.0, 1e-12, f64::NAN] {
            assert!(matches!(
                urban_heat_island(&lst, 30.0, std, &AnomalyParams::default(), &TiledProcessor::default()),
                Err(Error::DegenerateNormalizer { .. })
            ));
        }
    }

    #[test]
    fn test_utfvi_celsius() {
        let lst = Raster::from_vec(vec![40.0, 0.0, 20.0, 30.0], 2, 2).unwrap();
        let out = urban_thermal_field_variance(&lst, 30.0, &AnomalyParams::default(), &TiledProcessor::default())
            .unwrap();
        assert_relative_eq!(out.value(0, 0).unwrap(), 0.25);
        // LST == 0 has no value
        assert_eq!(out.value(0, 1), None);
        assert_relative_eq!(out.value(1, 0).unwrap(), -0.5);
        assert_relative_eq!(out.value(1, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_utfvi_kelvin() {
        let lst = Raster::from_vec(vec![40.0, 0.0, 20.0, 30.0], 2, 2).unwrap();
        let params = AnomalyParams {
            utfvi_basis: UtfviBasis::Kelvin,
            ..Default::default()
        };
        let out = urban_thermal_field_variance(&lst, 30.0, &params, &TiledProcessor::default()).unwrap();
        assert_relative_eq!(out.value(0, 0).unwrap(), 10.0 / 313.15, epsilon = 1e-12);
        assert_relative_eq!(out.value(0, 1).unwrap(), -30.0 / 273.15, epsilon = 1e-12);
    }
}
