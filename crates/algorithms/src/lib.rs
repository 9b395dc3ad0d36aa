//! # landheat algorithms
//!
//! Surface energy and water balance indicators from Landsat composites.
//!
//! ## Stages
//!
//! - **radiometry**: Collection-2 scale factors
//! - **masking**: QA_PIXEL cloud and shadow mask
//! - **composite**: per-cell median (scenes) and mean (coarse ET)
//! - **imagery**: band math, NDVI, albedo proxy
//! - **radiation**: solar radiation proxy
//! - **thermal**: emissivity and land surface temperature
//! - **statistics**: zonal mean and standard deviation under a pixel budget
//! - **resample**: nearest-neighbour regridding
//! - **downscale**: NDVI-ratio ET downscaling
//! - **anomaly**: UHI and UTFVI
//! - **pipeline**: all of the above, in order

pub mod anomaly;
pub mod composite;
pub mod downscale;
pub mod imagery;
pub mod masking;
pub mod pipeline;
pub mod radiation;
pub mod radiometry;
pub mod resample;
pub mod statistics;
pub mod thermal;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::anomaly::{
        urban_heat_island, urban_thermal_field_variance, AnomalyParams, UtfviBasis,
    };
    pub use crate::composite::{mean_composite, median_composite};
    pub use crate::downscale::{downscale_et, DownscaleParams};
    pub use crate::imagery::{albedo, band_math, ndvi, ndvi_from_stack, normalized_difference};
    pub use crate::masking::{decode_qa_mask, mask_clouds, QaMaskParams};
    pub use crate::pipeline::{run_pipeline, run_with_source, PipelineOutputs, PipelineParams};
    pub use crate::radiation::{solar_radiation, SOLAR_CONSTANT};
    pub use crate::radiometry::{apply_scale_factors, ScaleFactors};
    pub use crate::resample::resample_nearest;
    pub use crate::statistics::{zonal_summary, Reducer, ZonalParams, ZonalStatistic, ZonalSummary};
    pub use crate::thermal::{emissivity_from_albedo, land_surface_temperature, lst_celsius};
    pub use landheat_core::prelude::*;
    pub use landheat_parallel::{ProcessingMode, TiledProcessor};
}
