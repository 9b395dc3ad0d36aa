//! End-to-end pipeline
//!
//! ```text
//! scale -> mask -> median composite (clipped) -> NDVI, albedo
//!       -> solar radiation, emissivity -> LST
//!       == zonal barrier: NDVI mean, LST mean, LST std dev ==
//!       -> ET downscaling, UHI, UTFVI
//! ```
//!
//! Every stage is a pure function of its inputs. The zonal reductions are
//! the only point where the whole grid must be complete before continuing.

use crate::anomaly::{urban_heat_island, urban_thermal_field_variance, AnomalyParams};
use crate::composite::{mean_composite, median_composite};
use crate::downscale::{downscale_et, DownscaleParams};
use crate::imagery::{albedo, ndvi_from_stack};
use crate::masking::{mask_clouds, QaMaskParams};
use crate::radiation::solar_radiation;
use crate::radiometry::apply_scale_factors;
use crate::statistics::{zonal_summary, Reducer, ZonalParams, ZonalStatistic};
use crate::thermal::{emissivity_from_albedo, land_surface_temperature};
use landheat_core::io::{ExportRequest, ExportSink, SceneQuery, SceneSource};
use landheat_core::raster::Raster;
use landheat_core::{
    Band, CRS, DerivedField, Error, FieldKind, Result, SceneSeries, StudyRegion,
};
use landheat_parallel::{ProcessingMode, TiledProcessor, DEFAULT_TILE_SIZE};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

/// Resolution every export is requested at, metres
pub const EXPORT_SCALE: f64 = 30.0;
/// CRS every export is requested in
pub const EXPORT_EPSG: u32 = 4326;

/// Tunables for a pipeline run; every field has a default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub qa: QaMaskParams,
    pub zonal: ZonalParams,
    pub downscale: DownscaleParams,
    pub anomaly: AnomalyParams,
    pub processing: ProcessingMode,
    /// Edge length of the square tiles per-cell stages run on
    pub tile_size: usize,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            qa: QaMaskParams::default(),
            zonal: ZonalParams::default(),
            downscale: DownscaleParams::default(),
            anomaly: AnomalyParams::default(),
            processing: ProcessingMode::default(),
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl PipelineParams {
    /// Per-cell engine for a run; any dedicated thread pool is built here, once
    pub fn processor(&self) -> Result<TiledProcessor> {
        TiledProcessor::new(self.tile_size, self.processing)
    }
}

/// Everything a run derives
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub ndvi: DerivedField,
    pub albedo: DerivedField,
    pub solar_radiation: DerivedField,
    pub lst: DerivedField,
    pub et: DerivedField,
    pub uhi: DerivedField,
    pub utfvi: DerivedField,
    pub ndvi_mean: ZonalStatistic,
    pub lst_mean: ZonalStatistic,
    pub lst_std_dev: ZonalStatistic,
    region_bounds: (f64, f64, f64, f64),
}

impl PipelineOutputs {
    /// All seven derived fields
    pub fn fields(&self) -> [&DerivedField; 7] {
        [
            &self.ndvi,
            &self.albedo,
            &self.solar_radiation,
            &self.lst,
            &self.et,
            &self.uhi,
            &self.utfvi,
        ]
    }

    pub fn statistics(&self) -> [&ZonalStatistic; 3] {
        [&self.ndvi_mean, &self.lst_mean, &self.lst_std_dev]
    }

    /// Bounding box of the study region, in its CRS
    pub fn region_bounds(&self) -> (f64, f64, f64, f64) {
        self.region_bounds
    }

    /// The five export requests, each paired with its field
    pub fn exports(&self) -> Vec<(ExportRequest, &DerivedField)> {
        [&self.lst, &self.et, &self.solar_radiation, &self.uhi, &self.utfvi]
            .into_iter()
            .filter_map(|field| {
                let name = field.kind.export_name()?;
                Some((
                    ExportRequest {
                        name: name.to_string(),
                        region_bounds: self.region_bounds,
                        scale: EXPORT_SCALE,
                        crs: CRS::from_epsg(EXPORT_EPSG),
                    },
                    field,
                ))
            })
            .collect()
    }

    /// Hand every export to `sink`, returning how many were exported
    pub fn export_all<S: ExportSink + ?Sized>(&self, sink: &mut S) -> Result<usize> {
        let exports = self.exports();
        for (request, field) in &exports {
            info!(name = %request.name, valid = field.raster.valid_count(), "exporting");
            sink.export(request, field)?;
        }
        Ok(exports.len())
    }
}

/// Run every stage over an already filtered scene series.
///
/// `et_series` is the coarse ET collection for the same window; it is
/// reduced to its per-cell mean before downscaling.
pub fn run_pipeline(
    series: &SceneSeries,
    et_series: &[Raster<f64>],
    region: &StudyRegion,
    params: &PipelineParams,
) -> Result<PipelineOutputs> {
    let tiles = params.processor()?;
    info!(
        scenes = series.len(),
        et_rasters = et_series.len(),
        mode = ?params.processing,
        tile_size = tiles.tile_size(),
        "running pipeline"
    );

    let scaled = stage("scale", || {
        series.map(|s| Ok(s.with_stack(apply_scale_factors(&s.stack, &tiles)?)))
    })?;
    let masked = stage("mask", || {
        scaled.map(|s| Ok(s.with_stack(mask_clouds(&s.stack, &params.qa, &tiles)?)))
    })?;

    let composite = stage("composite", || {
        let clip = region.rasterize(masked.scenes()[0].stack.template())?;
        median_composite(&masked, Some(&clip), &tiles)
    })?;

    let ndvi = stage("ndvi", || {
        derived(FieldKind::Ndvi, ndvi_from_stack(&composite, &tiles)?)
    })?;
    let albedo_field = stage("albedo", || {
        derived(FieldKind::Albedo, albedo(&composite, &tiles)?)
    })?;
    let solar = stage("solar_radiation", || {
        derived(
            FieldKind::SolarRadiation,
            solar_radiation(&albedo_field.raster, &tiles)?,
        )
    })?;
    let lst = stage("lst", || {
        let emissivity = emissivity_from_albedo(&albedo_field.raster, &tiles)?;
        derived(
            FieldKind::Lst,
            land_surface_temperature(composite.band(Band::THERMAL)?, &emissivity, &tiles)?,
        )
    })?;

    // Barrier: everything below depends on region-wide scalars
    let (ndvi_mean, lst_mean, lst_std_dev) = stage("zonal", || {
        let ndvi_summary = zonal_summary(&ndvi.raster, region, &params.zonal, &tiles)?;
        let lst_summary = zonal_summary(&lst.raster, region, &params.zonal, &tiles)?;
        let stats = (
            ndvi_summary.statistic(FieldKind::Ndvi, Reducer::Mean),
            lst_summary.statistic(FieldKind::Lst, Reducer::Mean),
            lst_summary.statistic(FieldKind::Lst, Reducer::StdDev),
        );
        info!("{}", stats.0);
        info!("{}", stats.1);
        info!("{}", stats.2);
        Ok(stats)
    })?;

    let et = stage("downscale", || {
        let coarse = mean_composite(et_series, &tiles)?;
        derived(
            FieldKind::Et30m,
            downscale_et(
                &coarse,
                &ndvi.raster,
                ndvi_mean.value,
                &params.downscale,
                &tiles,
            )?,
        )
    })?;
    let uhi = stage("uhi", || {
        derived(
            FieldKind::Uhi,
            urban_heat_island(
                &lst.raster,
                lst_mean.value,
                lst_std_dev.value,
                &params.anomaly,
                &tiles,
            )?,
        )
    })?;
    let utfvi = stage("utfvi", || {
        derived(
            FieldKind::Utfvi,
            urban_thermal_field_variance(&lst.raster, lst_mean.value, &params.anomaly, &tiles)?,
        )
    })?;

    let region_bounds = region
        .bounds()
        .ok_or_else(|| Error::MalformedRegion("region has no extent".into()))?;

    Ok(PipelineOutputs {
        ndvi,
        albedo: albedo_field,
        solar_radiation: solar,
        lst,
        et,
        uhi,
        utfvi,
        ndvi_mean,
        lst_mean,
        lst_std_dev,
        region_bounds,
    })
}

/// Fetch scenes and coarse ET from `source`, then run the pipeline
pub fn run_with_source<S: SceneSource + ?Sized>(
    source: &S,
    query: &SceneQuery,
    params: &PipelineParams,
) -> Result<PipelineOutputs> {
    let series = source.scenes(query)?;
    let et = source.coarse_et(query)?;
    run_pipeline(&series, &et, &query.region, params)
}

fn stage<T>(name: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let span = info_span!("stage", stage = name);
    let _guard = span.enter();
    f()
}

fn derived(kind: FieldKind, raster: Raster<f64>) -> Result<DerivedField> {
    let field = DerivedField::new(kind, raster);
    let outside = field.out_of_range_count();
    if outside > 0 {
        warn!(field = %kind, cells = outside, "values outside the declared range");
    }
    info!(field = %kind, valid = field.raster.valid_count(), "derived field");
    Ok(field)
}
