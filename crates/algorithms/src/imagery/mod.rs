//! Imagery analysis algorithms
//!
//! - Band math: mask-aware raster algebra
//! - Spectral indices: NDVI and the broadband albedo proxy

pub(crate) mod band_math;
mod indices;

pub use band_math::{band_math, band_math_binary, BandMathOp};
pub use indices::{albedo, ndvi, ndvi_from_stack, normalized_difference};
