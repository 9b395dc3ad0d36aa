//! Run configuration and the manifest-backed scene source

use anyhow::{Context, Result};
use chrono::NaiveDate;
use landheat_algorithms::pipeline::PipelineParams;
use landheat_core::io::{read_geotiff, SceneQuery, SceneSource};
use landheat_core::{
    Band, BandStack, CRS, DateWindow, Raster, Scene, SceneMetadata, SceneSeries, StudyRegion,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn default_cloud_cover_max() -> f64 {
    10.0
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// `landheat run --config` document
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    /// Exclusive
    pub end_date: NaiveDate,
    /// Percent; scenes must be strictly below
    #[serde(default = "default_cloud_cover_max")]
    pub cloud_cover_max: f64,
    pub region: RegionConfig,
    pub scenes: Vec<SceneEntry>,
    /// Coarse ET rasters, filtered to the study window like the scenes
    pub et: Vec<EtEntry>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub params: PipelineParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    pub epsg: u32,
    pub exterior: Vec<[f64; 2]>,
    #[serde(default)]
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl RegionConfig {
    pub fn to_region(&self) -> landheat_core::Result<StudyRegion> {
        StudyRegion::from_rings(&self.exterior, &self.holes, CRS::from_epsg(self.epsg))
    }
}

/// One scene of the local manifest
#[derive(Debug, Clone, Deserialize)]
pub struct SceneEntry {
    pub id: String,
    pub date: NaiveDate,
    pub cloud_cover: f64,
    /// Band name (`SR_B2`, ..., `QA_PIXEL`) to GeoTIFF path
    pub bands: BTreeMap<Band, PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EtEntry {
    pub date: NaiveDate,
    pub path: PathBuf,
}

impl RunConfig {
    /// Read a config file; relative paths inside it resolve against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: RunConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for scene in &mut config.scenes {
            for file in scene.bands.values_mut() {
                *file = resolve(base, file);
            }
        }
        for entry in &mut config.et {
            entry.path = resolve(base, &entry.path);
        }
        config.output_dir = resolve(base, &config.output_dir);
        Ok(config)
    }

    pub fn window(&self) -> landheat_core::Result<DateWindow> {
        DateWindow::new(self.start_date, self.end_date)
    }

    pub fn query(&self) -> Result<SceneQuery> {
        Ok(SceneQuery {
            window: self.window().context("Invalid study window")?,
            region: self.region.to_region().context("Invalid study region")?,
            cloud_cover_max: self.cloud_cover_max,
        })
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Scenes and ET rasters listed in a run config, read from local GeoTIFFs
pub struct ManifestSource {
    scenes: Vec<SceneEntry>,
    et: Vec<EtEntry>,
}

impl ManifestSource {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            scenes: config.scenes.clone(),
            et: config.et.clone(),
        }
    }
}

impl SceneSource for ManifestSource {
    fn scenes(&self, query: &SceneQuery) -> landheat_core::Result<SceneSeries> {
        let region_bounds = query.region.bounds();
        let mut scenes = Vec::new();

        // Metadata filters first so excluded scenes are never read
        for entry in self.scenes.iter().filter(|e| {
            query.window.contains(e.date) && e.cloud_cover < query.cloud_cover_max
        }) {
            let bands = entry
                .bands
                .iter()
                .map(|(band, path)| Ok((*band, read_geotiff::<f64, _>(path)?)))
                .collect::<landheat_core::Result<BTreeMap<Band, Raster<f64>>>>()?;
            let stack = BandStack::new(bands)?;

            if let Some(region) = region_bounds
                && !intersects(stack.template().bounds(), region)
            {
                debug!(scene = %entry.id, "scene footprint misses the study region");
                continue;
            }

            scenes.push(Scene::new(
                SceneMetadata {
                    id: entry.id.clone(),
                    date: entry.date,
                    cloud_cover: entry.cloud_cover,
                },
                stack,
            ));
        }

        info!(
            listed = self.scenes.len(),
            selected = scenes.len(),
            "selected scenes from manifest"
        );
        SceneSeries::new(scenes)
    }

    fn coarse_et(&self, query: &SceneQuery) -> landheat_core::Result<Vec<Raster<f64>>> {
        self.et
            .iter()
            .filter(|e| query.window.contains(e.date))
            .map(|e| read_geotiff::<f64, _>(&e.path))
            .collect()
    }
}

fn intersects(a: (f64, f64, f64, f64), b: (f64, f64, f64, f64)) -> bool {
    a.0 <= b.2 && b.0 <= a.2 && a.1 <= b.3 && b.1 <= a.3
}
