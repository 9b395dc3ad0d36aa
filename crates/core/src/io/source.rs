//! Ingestion collaborator interface

use crate::error::Result;
use crate::raster::Raster;
use crate::region::StudyRegion;
use crate::scene::{DateWindow, SceneSeries};

/// Parameters every ingestion request carries
#[derive(Debug, Clone)]
pub struct SceneQuery {
    pub window: DateWindow,
    pub region: StudyRegion,
    /// Maximum scene cloud cover, percent (exclusive)
    pub cloud_cover_max: f64,
}

/// Supplies raw scenes and the coarse evapotranspiration product.
///
/// Implementations filter by region bounds, date window and cloud cover;
/// returned scenes hold unscaled digital numbers.
pub trait SceneSource {
    fn scenes(&self, query: &SceneQuery) -> Result<SceneSeries>;

    /// Coarse-resolution ET rasters acquired inside the query window
    fn coarse_et(&self, query: &SceneQuery) -> Result<Vec<Raster<f64>>>;
}
