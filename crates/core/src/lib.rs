//! # landheat core
//!
//! Core types and I/O for deriving land-surface energy and water balance
//! indicators from Landsat composites.
//!
//! This crate provides:
//! - `Raster<T>` with an explicit per-cell validity `Mask`
//! - `GeoTransform` and `CRS` for grid identity
//! - `BandStack`, `Scene` and `SceneSeries` for multi-temporal band sets
//! - `StudyRegion` polygon rasterization
//! - `DerivedField` output metadata
//! - GeoTIFF I/O and the ingestion/export collaborator traits

pub mod band;
pub mod crs;
pub mod error;
pub mod field;
pub mod io;
pub mod raster;
pub mod region;
pub mod scene;

pub use band::{Band, BandGroup, BandStack};
pub use crs::CRS;
pub use error::{Error, Result};
pub use field::{DerivedField, DisplayParams, FieldKind};
pub use raster::{GeoTransform, Mask, Raster, RasterElement};
pub use region::StudyRegion;
pub use scene::{DateWindow, Scene, SceneMetadata, SceneSeries};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::band::{Band, BandStack};
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::field::{DerivedField, FieldKind};
    pub use crate::raster::{GeoTransform, Mask, Raster, RasterElement};
    pub use crate::region::StudyRegion;
    pub use crate::scene::{DateWindow, Scene, SceneMetadata, SceneSeries};
}
