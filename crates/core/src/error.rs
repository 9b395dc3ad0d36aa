//! Error types for landheat

use thiserror::Error;

/// Main error type for landheat operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Raster grids are not aligned: {0}")]
    GeometryMismatch(String),

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Band {0} is missing from the band stack")]
    MissingBand(String),

    #[error("Scenes do not share the same band set: {0}")]
    BandSetMismatch(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A composite or zonal reduction had no contributing cells.
    #[error("No valid observations: {0}")]
    NoValidObservations(String),

    /// A zonal reduction would need more cells than the configured budget.
    #[error("Pixel budget exceeded: {required} cells required, budget is {budget}")]
    PixelBudgetExceeded { required: u64, budget: u64 },

    /// A region-wide normalizer is zero or below its stability threshold.
    #[error("Degenerate normalizer {name} = {value:e} (threshold {threshold:e})")]
    DegenerateNormalizer {
        name: &'static str,
        value: f64,
        threshold: f64,
    },

    /// The study region is empty or lies outside the imagery footprint.
    #[error("Malformed study region: {0}")]
    MalformedRegion(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for landheat operations
pub type Result<T> = std::result::Result<T, Error>;
