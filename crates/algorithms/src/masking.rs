//! Cloud and cloud-shadow masking from the `QA_PIXEL` band

use landheat_core::raster::Raster;
use landheat_core::{Band, BandStack, Error, Mask, Result};
use landheat_parallel::TiledProcessor;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cloud shadow flag of `QA_PIXEL`
pub const CLOUD_SHADOW_BIT: u8 = 3;
/// Cloud flag of `QA_PIXEL`
pub const CLOUD_BIT: u8 = 5;

/// Parameters for QA decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaMaskParams {
    /// Bits that must all be unset for a cell to be valid
    pub bits: Vec<u8>,
}

impl Default for QaMaskParams {
    fn default() -> Self {
        Self {
            bits: vec![CLOUD_SHADOW_BIT, CLOUD_BIT],
        }
    }
}

impl QaMaskParams {
    fn flag_mask(&self) -> Result<u16> {
        self.bits.iter().try_fold(0u16, |acc, &bit| {
            if bit > 15 {
                return Err(Error::InvalidParameter {
                    name: "bits",
                    value: bit.to_string(),
                    reason: "QA_PIXEL is a 16-bit band".into(),
                });
            }
            Ok(acc | (1u16 << bit))
        })
    }
}

/// Decode a quality band into a validity mask.
///
/// A cell is valid iff every configured bit is unset and the quality cell
/// itself holds a value. Quality values that are not 16-bit integers are
/// treated as invalid.
pub fn decode_qa_mask(
    qa: &Raster<f64>,
    params: &QaMaskParams,
    tiles: &TiledProcessor,
) -> Result<Mask> {
    let flags = params.flag_mask()?;
    let clear = tiles.map_cells(&[qa], |v| {
        let q = v[0];
        if !(0.0..=u16::MAX as f64).contains(&q) || q.fract() != 0.0 {
            return None;
        }
        ((q as u16) & flags == 0).then_some(1.0)
    })?;
    Ok(clear.mask().clone())
}

/// Mask clouds and shadows out of every band of a stack
pub fn mask_clouds(
    stack: &BandStack,
    params: &QaMaskParams,
    tiles: &TiledProcessor,
) -> Result<BandStack> {
    let mask = decode_qa_mask(stack.band(Band::QA)?, params, tiles)?;
    let masked = stack.with_mask(&mask)?;
    debug!(
        clear = mask.count_valid(),
        valid = masked.mask().count_valid(),
        "applied QA mask"
    );
    Ok(masked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use landheat_core::GeoTransform;

    fn qa_band(values: Vec<f64>) -> Raster<f64> {
        let mut r = Raster::from_vec(values, 2, 2).unwrap();
        r.set_transform(GeoTransform::new(0.0, 60.0, 30.0, -30.0));
        r
    }

    #[test]
    fn test_decode_default_bits() {
        // clear, shadow (bit 3), cloud (bit 5), dilated cloud only (bit 1)
        let qa = qa_band(vec![21824.0, 8.0, 32.0, 2.0]);
        let mask = decode_qa_mask(&qa, &QaMaskParams::default(), &TiledProcessor::default())
            .unwrap();
        assert!(mask.is_valid(0, 0));
        assert!(!mask.is_valid(0, 1));
        assert!(!mask.is_valid(1, 0));
        assert!(mask.is_valid(1, 1));
    }

    #[test]
    fn test_invalid_qa_cell_is_invalid() {
        let mut qa = qa_band(vec![0.0; 4]);
        qa.set_invalid(1, 1);
        let mask = decode_qa_mask(&qa, &QaMaskParams::default(), &TiledProcessor::default())
            .unwrap();
        assert_eq!(mask.count_valid(), 3);
    }

    #[test]
    fn test_bit_out_of_range() {
        let qa = qa_band(vec![0.0; 4]);
        let params = QaMaskParams { bits: vec![16] };
        assert!(matches!(
            decode_qa_mask(&qa, &params, &TiledProcessor::default()),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_mask_clouds_applies_to_every_band() {
        let mut red = qa_band(vec![0.1; 4]);
        red.set_transform(GeoTransform::new(0.0, 60.0, 30.0, -30.0));
        let stack = BandStack::from_bands([
            (Band::RED, red),
            (Band::QA, qa_band(vec![0.0, 32.0, 0.0, 8.0])),
        ])
        .unwrap();

        let masked = mask_clouds(&stack, &QaMaskParams::default(), &TiledProcessor::default())
            .unwrap();
        assert_eq!(masked.mask().count_valid(), 2);
        assert_eq!(masked.band(Band::RED).unwrap().value(0, 1), None);
        assert_eq!(masked.band(Band::RED).unwrap().value(1, 0), Some(0.1));
    }

    #[test]
    fn test_mask_clouds_requires_qa() {
        let stack = BandStack::from_bands([(Band::RED, qa_band(vec![0.1; 4]))]).unwrap();
        assert!(matches!(
            mask_clouds(&stack, &QaMaskParams::default(), &TiledProcessor::default()),
            Err(Error::MissingBand(_))
        ));
    }
}
