//! I/O: GeoTIFF rasters and the ingestion/export collaborator interfaces

mod export;
mod native;
mod source;

pub use export::{ExportRequest, ExportSink, GeoTiffDirectorySink};
pub use native::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};
pub use source::{SceneQuery, SceneSource};
