//! Export collaborator interface

use crate::crs::CRS;
use crate::error::Result;
use crate::field::DerivedField;
use std::path::{Path, PathBuf};

/// What the sink is asked to persist alongside the field itself
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    /// Output name, e.g. `Land_Surface_Temperature`
    pub name: String,
    /// Clip bounds (min_x, min_y, max_x, max_y) in the region's CRS
    pub region_bounds: (f64, f64, f64, f64),
    /// Pixel resolution in metres
    pub scale: f64,
    /// Target CRS
    pub crs: CRS,
}

/// Receives derived fields to persist
pub trait ExportSink {
    fn export(&mut self, request: &ExportRequest, field: &DerivedField) -> Result<()>;
}

/// Writes each field as `<dir>/<name>.tif`.
///
/// No reprojection or resampling: the field is written on its own grid.
/// A request for a different CRS or scale is logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct GeoTiffDirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl GeoTiffDirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far, in export order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ExportSink for GeoTiffDirectorySink {
    fn export(&mut self, request: &ExportRequest, field: &DerivedField) -> Result<()> {
        if let Some(crs) = field.raster.crs()
            && !crs.is_equivalent(&request.crs)
        {
            tracing::warn!(
                name = %request.name,
                field_crs = %crs,
                target_crs = %request.crs,
                "writing in the field's own CRS; reprojection is left to downstream tools"
            );
        }
        let cell = field.raster.cell_size();
        if (cell - request.scale).abs() > 1e-6 * request.scale.max(1.0) {
            tracing::warn!(
                name = %request.name,
                cell_size = cell,
                requested = request.scale,
                "writing at the field's own resolution"
            );
        }

        let path = self.dir.join(format!("{}.tif", request.name));
        super::write_geotiff(&field.raster, &path)?;
        tracing::info!(path = %path.display(), "exported {}", field.name());
        self.written.push(path);
        Ok(())
    }
}
