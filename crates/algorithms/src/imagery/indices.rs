//! Spectral indices
//!
//! NDVI and a broadband albedo proxy computed from a reflectance composite.

use crate::imagery::band_math::{DENOMINATOR_EPSILON, finite};
use landheat_core::raster::Raster;
use landheat_core::{Band, BandStack, Result};
use landheat_parallel::TiledProcessor;

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Cells where the sum is zero, or either input is invalid, have no value.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(
    band_a: &Raster<f64>,
    band_b: &Raster<f64>,
    tiles: &TiledProcessor,
) -> Result<Raster<f64>> {
    tiles.map_cells(&[band_a, band_b], |v| {
        let sum = v[0] + v[1];
        if sum.abs() < DENOMINATOR_EPSILON {
            return None;
        }
        finite((v[0] - v[1]) / sum)
    })
}

// ---------------------------------------------------------------------------
// NDVI
// ---------------------------------------------------------------------------

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Values range from -1 to 1:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water: -1.0 to 0.0
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>, tiles: &TiledProcessor) -> Result<Raster<f64>> {
    normalized_difference(nir, red, tiles)
}

/// NDVI from a composite holding `SR_B5` and `SR_B4`
pub fn ndvi_from_stack(stack: &BandStack, tiles: &TiledProcessor) -> Result<Raster<f64>> {
    ndvi(stack.band(Band::NIR)?, stack.band(Band::RED)?, tiles)
}

// ---------------------------------------------------------------------------
// Albedo
// ---------------------------------------------------------------------------

/// Broadband albedo proxy
///
/// `Albedo = (B2 + B3 + B4) / (B2 + B3 + B4 + B5 + B6 + B7)`
///
/// The visible share of total optical reflectance. This is a simplified
/// proxy, not a published albedo model. A zero total has no value.
pub fn albedo(stack: &BandStack, tiles: &TiledProcessor) -> Result<Raster<f64>> {
    let bands = Band::OPTICAL
        .iter()
        .map(|b| stack.band(*b))
        .collect::<Result<Vec<_>>>()?;

    // OPTICAL is ordered B2..B7, the first three are visible
    tiles.map_cells(&bands, |v| {
        let visible = v[0] + v[1] + v[2];
        let total: f64 = v.iter().sum();
        if total.abs() < DENOMINATOR_EPSILON {
            return None;
        }
        finite(visible / total)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use landheat_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 30.0, 30.0, -30.0));
        r
    }

    fn make_gradient(rows: usize, cols: usize, start: f64, step: f64) -> Raster<f64> {
        let mut r = make_band(rows, cols, 0.0);
        for row in 0..rows {
            for col in 0..cols {
                r.set(row, col, start + (row * cols + col) as f64 * step)
                    .unwrap();
            }
        }
        r
    }

    fn optical_stack(values: [f64; 6]) -> BandStack {
        BandStack::from_bands(
            Band::OPTICAL
                .iter()
                .zip(values)
                .map(|(b, v)| (*b, make_band(4, 4, v))),
        )
        .unwrap()
    }

    #[test]
    fn test_normalized_difference_basic() {
        let a = make_band(5, 5, 0.8);
        let b = make_band(5, 5, 0.2);

        let result = normalized_difference(&a, &b, &TiledProcessor::default()).unwrap();

        // (0.8 - 0.2) / (0.8 + 0.2) = 0.6
        assert_relative_eq!(result.value(2, 2).unwrap(), 0.6, epsilon = 1e-10);
    }

    #[test]
    fn test_normalized_difference_range() {
        let a = make_gradient(10, 10, 0.1, 0.01);
        let b = make_gradient(10, 10, 0.5, -0.005);

        let result = normalized_difference(&a, &b, &TiledProcessor::default()).unwrap();

        for row in 0..10 {
            for col in 0..10 {
                if let Some(val) = result.value(row, col) {
                    assert!(
                        (-1.0..=1.0).contains(&val),
                        "ND out of range: {} at ({}, {})",
                        val,
                        row,
                        col
                    );
                }
            }
        }
    }

    #[test]
    fn test_ndvi() {
        let nir = make_band(5, 5, 0.5);
        let red = make_band(5, 5, 0.1);

        let result = ndvi(&nir, &red, &TiledProcessor::default()).unwrap();
        let expected = (0.5 - 0.1) / (0.5 + 0.1);
        assert_relative_eq!(result.value(2, 2).unwrap(), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_ndvi_water() {
        // Red > NIR gives negative NDVI
        let nir = make_band(5, 5, 0.05);
        let red = make_band(5, 5, 0.15);

        let result = ndvi(&nir, &red, &TiledProcessor::default()).unwrap();
        assert!(result.value(2, 2).unwrap() < 0.0);
    }

    #[test]
    fn test_ndvi_zero_denominator() {
        let nir = make_band(3, 3, 0.0);
        let red = make_band(3, 3, 0.0);

        let result = ndvi(&nir, &red, &TiledProcessor::default()).unwrap();
        assert_eq!(result.valid_count(), 0);
    }

    #[test]
    fn test_ndvi_from_stack_missing_band() {
        let stack = BandStack::from_bands([(Band::RED, make_band(2, 2, 0.1))]).unwrap();
        assert!(matches!(
            ndvi_from_stack(&stack, &TiledProcessor::default()),
            Err(landheat_core::Error::MissingBand(_))
        ));
    }

    #[test]
    fn test_albedo() {
        let stack = optical_stack([0.1, 0.1, 0.1, 0.3, 0.2, 0.2]);
        let result = albedo(&stack, &TiledProcessor::default()).unwrap();
        assert_relative_eq!(result.value(0, 0).unwrap(), 0.3, epsilon = 1e-10);
    }

    #[test]
    fn test_albedo_in_unit_range() {
        let stack = optical_stack([0.04, 0.07, 0.09, 0.35, 0.25, 0.15]);
        let result = albedo(&stack, &TiledProcessor::default()).unwrap();
        let v = result.value(3, 3).unwrap();
        assert!((0.0..=1.0).contains(&v));
    }

    #[test]
    fn test_albedo_zero_total() {
        let stack = optical_stack([0.0; 6]);
        let result = albedo(&stack, &TiledProcessor::default()).unwrap();
        assert_eq!(result.valid_count(), 0);
    }
}
