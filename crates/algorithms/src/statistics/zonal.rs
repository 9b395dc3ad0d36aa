//! Zonal statistics over a study region
//!
//! Computes the mean and population standard deviation of a field over the
//! cells of a study region, at a declared scale and under a pixel budget.
//!
//! The budget is checked against the number of cells the reduction would
//! visit before any field value is read. A reduction that would exceed it
//! fails with `PixelBudgetExceeded` instead of subsampling.

use landheat_core::raster::Raster;
use landheat_core::{CRS, Error, FieldKind, Mask, Result, StudyRegion};
use landheat_parallel::{ParallelStrategy, TiledProcessor};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Tolerance when matching the declared scale to a multiple of the cell size
const SCALE_TOLERANCE: f64 = 1e-6;

/// Length of one degree of longitude at the equator on the WGS84 ellipsoid
const METRES_PER_DEGREE: f64 = 111_319.490_793;

/// Parameters for a zonal reduction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonalParams {
    /// Resolution of the reduction in metres
    ///
    /// On geographic grids a degree counts as its equatorial length and the
    /// factor is rounded to the nearest whole number of cells.
    pub scale: f64,
    /// Maximum number of cells the reduction may visit
    pub max_pixels: u64,
}

impl Default for ZonalParams {
    fn default() -> Self {
        Self {
            scale: 30.0,
            max_pixels: 10_000_000_000,
        }
    }
}

/// Which scalar a statistic reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Mean,
    StdDev,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Mean => f.write_str("mean"),
            Reducer::StdDev => f.write_str("stdDev"),
        }
    }
}

/// One named region-wide scalar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZonalStatistic {
    pub field: FieldKind,
    pub reducer: Reducer,
    pub value: f64,
    /// Scale the reduction ran at
    pub scale: f64,
    /// Budget the reduction ran under
    pub max_pixels: u64,
    /// Number of contributing cells
    pub count: u64,
}

impl fmt::Display for ZonalStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} = {:.6} (n={}, scale={}, maxPixels={:e})",
            self.field, self.reducer, self.value, self.count, self.scale, self.max_pixels as f64
        )
    }
}

/// Mean and population standard deviation from a single pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonalSummary {
    pub count: u64,
    pub mean: f64,
    pub std_dev: f64,
    pub scale: f64,
    pub max_pixels: u64,
}

impl ZonalSummary {
    /// Tag one of the summary's scalars with the field it describes
    pub fn statistic(&self, field: FieldKind, reducer: Reducer) -> ZonalStatistic {
        let value = match reducer {
            Reducer::Mean => self.mean,
            Reducer::StdDev => self.std_dev,
        };
        ZonalStatistic {
            field,
            reducer,
            value,
            scale: self.scale,
            max_pixels: self.max_pixels,
            count: self.count,
        }
    }
}

/// Streaming mean/variance accumulator (Welford), mergeable (Chan et al.)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Moments {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn merge(self, other: Moments) -> Moments {
        if self.count == 0 {
            return other;
        }
        if other.count == 0 {
            return self;
        }
        let count = self.count + other.count;
        let (na, nb, n) = (self.count as f64, other.count as f64, count as f64);
        let delta = other.mean - self.mean;
        Moments {
            count,
            mean: self.mean + delta * nb / n,
            m2: self.m2 + other.m2 + delta * delta * na * nb / n,
        }
    }

    fn population_std_dev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.m2 / self.count as f64).max(0.0).sqrt()
    }
}

/// Integer aggregation factor between the declared scale (metres) and the
/// cell size of a grid in `crs`
pub fn scale_factor(cell_size: f64, crs: Option<&CRS>, scale: f64) -> Result<usize> {
    let invalid = |reason: String| Error::InvalidParameter {
        name: "scale",
        value: scale.to_string(),
        reason,
    };
    if !scale.is_finite() || scale <= 0.0 {
        return Err(invalid("must be a positive number of metres".into()));
    }
    if !cell_size.is_finite() || cell_size <= 0.0 {
        return Err(invalid(format!("grid cell size {} is not usable", cell_size)));
    }

    if let Some(crs) = crs
        && crs.is_geographic()
    {
        let cell_metres = cell_size * METRES_PER_DEGREE;
        let k = (scale / cell_metres).round().max(1.0);
        debug!(
            %crs,
            cell_degrees = cell_size,
            cell_metres,
            factor = k,
            "scale converted to a geographic grid"
        );
        return Ok(k as usize);
    }

    let factor = scale / cell_size;
    let k = factor.round();
    if k < 1.0 || (factor - k).abs() > SCALE_TOLERANCE {
        return Err(invalid(format!(
            "must be a positive integer multiple of the {} m cell size",
            cell_size
        )));
    }
    Ok(k as usize)
}

/// Mean and population standard deviation of `field` over `region`.
///
/// At a scale of `k` cells, `k×k` blocks are first averaged over their valid
/// cells inside the region. The number of blocks intersecting the region is
/// compared with `params.max_pixels` before any value is read.
pub fn zonal_summary(
    field: &Raster<f64>,
    region: &StudyRegion,
    params: &ZonalParams,
    tiles: &TiledProcessor,
) -> Result<ZonalSummary> {
    let k = scale_factor(field.cell_size(), field.crs(), params.scale)?;
    let region_mask = region.rasterize(field)?;

    let (rows, cols) = field.shape();
    let (block_rows, block_cols) = (rows.div_ceil(k), cols.div_ceil(k));
    let blocks = region_blocks(&region_mask, k, block_rows, block_cols);

    let required = blocks.iter().filter(|&&b| b).count() as u64;
    debug!(
        required,
        budget = params.max_pixels,
        factor = k,
        "zonal pixel budget"
    );
    if required > params.max_pixels {
        return Err(Error::PixelBudgetExceeded {
            required,
            budget: params.max_pixels,
        });
    }

    let row_moments = tiles.executor().par_map(0..block_rows, |br| {
        let mut acc = Moments::default();
        for bc in 0..block_cols {
            if !blocks[(br, bc)] {
                continue;
            }
            let mut sum = 0.0;
            let mut n = 0usize;
            for row in br * k..((br + 1) * k).min(rows) {
                for col in bc * k..((bc + 1) * k).min(cols) {
                    if region_mask.is_valid(row, col)
                        && let Some(v) = field.value(row, col)
                    {
                        sum += v;
                        n += 1;
                    }
                }
            }
            if n > 0 {
                acc.push(sum / n as f64);
            }
        }
        acc
    })?;

    let moments = row_moments
        .into_iter()
        .fold(Moments::default(), Moments::merge);

    if moments.count == 0 {
        return Err(Error::NoValidObservations(
            "no valid cell of the field lies inside the study region".into(),
        ));
    }

    Ok(ZonalSummary {
        count: moments.count,
        mean: moments.mean,
        std_dev: moments.population_std_dev(),
        scale: params.scale,
        max_pixels: params.max_pixels,
    })
}

/// Which `k×k` blocks contain at least one region cell
fn region_blocks(region: &Mask, k: usize, block_rows: usize, block_cols: usize) -> Array2<bool> {
    let mut blocks = Array2::from_elem((block_rows, block_cols), false);
    for ((row, col), &inside) in region.as_array().indexed_iter() {
        if inside {
            blocks[(row / k, col / k)] = true;
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use landheat_core::{CRS, GeoTransform};

    /// 5x5 grid of 30 m cells covering (0, 0)..(150, 150)
    fn field(values: Vec<f64>) -> Raster<f64> {
        let mut r = Raster::from_vec(values, 5, 5).unwrap();
        r.set_transform(GeoTransform::new(0.0, 150.0, 30.0, -30.0));
        r
    }

    fn whole_grid() -> StudyRegion {
        StudyRegion::from_bounds(0.0, 0.0, 150.0, 150.0, CRS::default()).unwrap()
    }

    fn sequence() -> Vec<f64> {
        (0..25).map(|i| i as f64).collect()
    }

    #[test]
    fn test_mean_and_population_std() {
        let summary = zonal_summary(
            &field(sequence()),
            &whole_grid(),
            &ZonalParams::default(),
            &TiledProcessor::default(),
        )
        .unwrap();

        assert_eq!(summary.count, 25);
        assert_relative_eq!(summary.mean, 12.0, epsilon = 1e-12);
        // population variance of 0..25 is (25^2 - 1) / 12 = 52
        assert_relative_eq!(summary.std_dev, 52f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_region_restricts_cells() {
        // Covers the 2x2 upper-left cells: values 0, 1, 5, 6
        let region = StudyRegion::from_bounds(0.0, 90.0, 60.0, 150.0, CRS::default()).unwrap();
        let summary = zonal_summary(
            &field(sequence()),
            &region,
            &ZonalParams::default(),
            &TiledProcessor::default(),
        )
        .unwrap();
        assert_eq!(summary.count, 4);
        assert_relative_eq!(summary.mean, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_cells_excluded() {
        let mut f = field(vec![1.0; 25]);
        f.set(0, 0, 1000.0).unwrap();
        f.set_invalid(0, 0);
        let summary = zonal_summary(
            &f,
            &whole_grid(),
            &ZonalParams::default(),
            &TiledProcessor::default(),
        )
        .unwrap();
        assert_eq!(summary.count, 24);
        assert_relative_eq!(summary.mean, 1.0);
        assert_relative_eq!(summary.std_dev, 0.0);
    }

    #[test]
    fn test_budget_exceeded() {
        let params = ZonalParams {
            max_pixels: 24,
            ..Default::default()
        };
        let err = zonal_summary(
            &field(sequence()),
            &whole_grid(),
            &params,
            &TiledProcessor::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::PixelBudgetExceeded {
                required: 25,
                budget: 24
            }
        ));
    }

    #[test]
    fn test_coarser_scale_fits_budget() {
        // 60 m blocks: 3x3 = 9 blocks
        let params = ZonalParams {
            scale: 60.0,
            max_pixels: 9,
        };
        let summary = zonal_summary(
            &field(vec![2.0; 25]),
            &whole_grid(),
            &params,
            &TiledProcessor::default(),
        )
        .unwrap();
        assert_eq!(summary.count, 9);
        assert_relative_eq!(summary.mean, 2.0);
    }

    #[test]
    fn test_non_integer_scale_rejected() {
        let utm = CRS::from_epsg(32719);
        assert!(scale_factor(30.0, Some(&utm), 45.0).is_err());
        assert!(scale_factor(30.0, Some(&utm), 0.0).is_err());
        assert!(scale_factor(30.0, None, 15.0).is_err());
        assert_eq!(scale_factor(30.0, Some(&utm), 90.0).unwrap(), 3);
        assert_eq!(scale_factor(30.000000001, None, 30.0).unwrap(), 1);
    }

    #[test]
    fn test_metre_scale_on_geographic_grid() {
        let wgs84 = CRS::wgs84();
        // Landsat 30 m cells warped to EPSG:4326
        assert_eq!(scale_factor(0.00027, Some(&wgs84), 30.0).unwrap(), 1);
        assert_eq!(scale_factor(0.00027, Some(&wgs84), 90.0).unwrap(), 3);
        assert_eq!(scale_factor(0.00027, Some(&wgs84), 1.0).unwrap(), 1);
        assert!(scale_factor(0.00027, Some(&wgs84), -30.0).is_err());
    }

    #[test]
    fn test_default_scale_on_geographic_field() {
        let cell = 0.00027;
        let mut f = Raster::from_vec(sequence(), 5, 5).unwrap();
        f.set_transform(GeoTransform::new(-70.0, -33.0, cell, -cell));
        f.set_crs(Some(CRS::wgs84()));
        let region = StudyRegion::from_bounds(
            -70.0,
            -33.0 - 5.0 * cell,
            -70.0 + 5.0 * cell,
            -33.0,
            CRS::wgs84(),
        )
        .unwrap();

        let summary = zonal_summary(
            &f,
            &region,
            &ZonalParams::default(),
            &TiledProcessor::default(),
        )
        .unwrap();
        assert_eq!(summary.count, 25);
        assert_relative_eq!(summary.mean, 12.0, epsilon = 1e-12);
        assert_eq!(summary.scale, 30.0);
    }

    #[test]
    fn test_all_invalid_region() {
        let f = field(vec![1.0; 25]).masked(&Mask::all_invalid(5, 5)).unwrap();
        assert!(matches!(
            zonal_summary(&f, &whole_grid(), &ZonalParams::default(), &TiledProcessor::default()),
            Err(Error::NoValidObservations(_))
        ));
    }

    #[test]
    fn test_chan_merge_matches_single_pass() {
        let values: Vec<f64> = (0..100).map(|i| ((i * 37) % 23) as f64 * 0.7 - 3.0).collect();

        let mut single = Moments::default();
        values.iter().for_each(|&v| single.push(v));

        let merged = values
            .chunks(7)
            .map(|chunk| {
                let mut m = Moments::default();
                chunk.iter().for_each(|&v| m.push(v));
                m
            })
            .fold(Moments::default(), Moments::merge);

        assert_eq!(merged.count, single.count);
        assert_relative_eq!(merged.mean, single.mean, epsilon = 1e-12);
        assert_relative_eq!(merged.m2, single.m2, epsilon = 1e-9);
    }

    #[test]
    fn test_statistic_tagging() {
        let summary = ZonalSummary {
            count: 10,
            mean: 0.4,
            std_dev: 0.1,
            scale: 30.0,
            max_pixels: 10_000_000_000,
        };
        let stat = summary.statistic(FieldKind::Lst, Reducer::StdDev);
        assert_eq!(stat.value, 0.1);
        assert_eq!(stat.field, FieldKind::Lst);
        assert_eq!(stat.max_pixels, 10_000_000_000);
    }
}
