//! Band math operations
//!
//! Raster algebra: apply mathematical functions to one or two rasters
//! element-wise. Invalid cells stay invalid; a function returning `None`
//! marks its output cell as "no value".

use landheat_core::Result;
use landheat_core::raster::Raster;
use landheat_parallel::TiledProcessor;

/// Denominators smaller than this are treated as zero
pub(crate) const DENOMINATOR_EPSILON: f64 = 1e-10;

/// Binary operations for band math
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandMathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
}

impl BandMathOp {
    fn apply(self, a: f64, b: f64) -> Option<f64> {
        let v = match self {
            BandMathOp::Add => a + b,
            BandMathOp::Subtract => a - b,
            BandMathOp::Multiply => a * b,
            BandMathOp::Divide => {
                if b.abs() < DENOMINATOR_EPSILON {
                    return None;
                }
                a / b
            }
            BandMathOp::Min => a.min(b),
            BandMathOp::Max => a.max(b),
        };
        finite(v)
    }
}

/// Apply a unary function to every valid cell of a raster.
///
/// Results that are not finite become "no value".
///
/// # Example
/// ```ignore
/// let scaled = band_math(&input, |v| Some(v * 0.0001), &tiles)?;
/// ```
pub fn band_math<F>(raster: &Raster<f64>, f: F, tiles: &TiledProcessor) -> Result<Raster<f64>>
where
    F: Fn(f64) -> Option<f64> + Sync + Send,
{
    tiles.map_cells(&[raster], |v| f(v[0]).and_then(finite))
}

/// Apply a binary operation between two aligned rasters element-wise.
///
/// An invalid cell in either input is invalid in the output. Division by
/// zero yields "no value".
pub fn band_math_binary(
    a: &Raster<f64>,
    b: &Raster<f64>,
    op: BandMathOp,
    tiles: &TiledProcessor,
) -> Result<Raster<f64>> {
    tiles.map_cells(&[a, b], |v| op.apply(v[0], v[1]))
}

#[inline]
pub(crate) fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use landheat_core::GeoTransform;

    fn make_band(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(5, 5, value);
        r.set_transform(GeoTransform::new(0.0, 150.0, 30.0, -30.0));
        r
    }

    #[test]
    fn test_band_math_unary() {
        let input = make_band(100.0);
        let result = band_math(&input, |v| Some(v.sqrt()), &TiledProcessor::default()).unwrap();
        assert_relative_eq!(result.value(2, 2).unwrap(), 10.0, epsilon = 1e-10);
    }

    #[test]
    fn test_band_math_keeps_invalid() {
        let mut input = make_band(100.0);
        input.set_invalid(2, 2);

        let result = band_math(&input, |v| Some(v * 2.0), &TiledProcessor::default()).unwrap();
        assert_eq!(result.value(2, 2), None);
        assert_eq!(result.value(1, 1), Some(200.0));
    }

    #[test]
    fn test_band_math_non_finite_is_no_value() {
        let input = make_band(-1.0);
        let result = band_math(&input, |v| Some(v.ln()), &TiledProcessor::default()).unwrap();
        assert_eq!(result.valid_count(), 0);
    }

    #[test]
    fn test_band_math_binary_add() {
        let result = band_math_binary(
            &make_band(3.0),
            &make_band(7.0),
            BandMathOp::Add,
            &TiledProcessor::default(),
        )
        .unwrap();
        assert_relative_eq!(result.value(2, 2).unwrap(), 10.0, epsilon = 1e-10);
    }

    #[test]
    fn test_band_math_binary_divide_by_zero() {
        let result = band_math_binary(
            &make_band(10.0),
            &make_band(0.0),
            BandMathOp::Divide,
            &TiledProcessor::default(),
        )
        .unwrap();
        assert_eq!(result.value(2, 2), None);
    }
}
