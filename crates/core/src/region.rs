//! Study region geometry

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{Mask, Raster, RasterElement};
use geo::{Area, BoundingRect, Contains};
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon, Rect};

/// Polygon area of interest plus its CRS.
///
/// Clips every output and bounds every zonal reduction. Rasterization uses
/// cell centres: a cell belongs to the region when its centre lies strictly
/// inside the polygon.
#[derive(Debug, Clone)]
pub struct StudyRegion {
    geometry: MultiPolygon<f64>,
    crs: CRS,
}

impl StudyRegion {
    pub fn new(geometry: MultiPolygon<f64>, crs: CRS) -> Result<Self> {
        let region = Self { geometry, crs };
        region.validate()?;
        Ok(region)
    }

    pub fn from_polygon(polygon: Polygon<f64>, crs: CRS) -> Result<Self> {
        Self::new(MultiPolygon::new(vec![polygon]), crs)
    }

    /// Build from an exterior ring and optional holes given as `[x, y]` pairs
    pub fn from_rings(exterior: &[[f64; 2]], holes: &[Vec<[f64; 2]>], crs: CRS) -> Result<Self> {
        let ring = |pts: &[[f64; 2]]| -> LineString<f64> {
            pts.iter().map(|&[x, y]| Coord { x, y }).collect()
        };
        let polygon = Polygon::new(ring(exterior), holes.iter().map(|h| ring(h)).collect());
        Self::from_polygon(polygon, crs)
    }

    /// Axis-aligned rectangle
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: CRS) -> Result<Self> {
        let rect = Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y });
        Self::from_polygon(rect.to_polygon(), crs)
    }

    /// Reject empty or zero-area geometry
    pub fn validate(&self) -> Result<()> {
        if self.geometry.0.is_empty() {
            return Err(Error::MalformedRegion("region has no polygons".into()));
        }
        if self
            .geometry
            .0
            .iter()
            .any(|p| p.exterior().0.len() < 4 && !p.exterior().0.is_empty())
        {
            return Err(Error::MalformedRegion(
                "polygon ring needs at least three distinct vertices".into(),
            ));
        }
        let area = self.area();
        if !area.is_finite() || area <= 0.0 {
            return Err(Error::MalformedRegion(format!("region area is {}", area)));
        }
        Ok(())
    }

    pub fn crs(&self) -> &CRS {
        &self.crs
    }

    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    /// Bounding box (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|r| (r.min().x, r.min().y, r.max().x, r.max().y))
    }

    /// Rasterize onto the grid of `template`.
    ///
    /// Fails with `CrsMismatch` when the grid carries a different CRS and with
    /// `MalformedRegion` when no cell centre falls inside the region.
    pub fn rasterize<T: RasterElement>(&self, template: &Raster<T>) -> Result<Mask> {
        if let Some(grid_crs) = template.crs()
            && !grid_crs.is_equivalent(&self.crs)
        {
            return Err(Error::CrsMismatch(self.crs.to_string(), grid_crs.to_string()));
        }

        let (rows, cols) = template.shape();
        let mut mask = Mask::all_invalid(rows, cols);

        let (rmin_x, rmin_y, rmax_x, rmax_y) = self
            .bounds()
            .ok_or_else(|| Error::MalformedRegion("region has no extent".into()))?;
        let (gmin_x, gmin_y, gmax_x, gmax_y) = template.bounds();
        if rmax_x < gmin_x || rmin_x > gmax_x || rmax_y < gmin_y || rmin_y > gmax_y {
            return Err(Error::MalformedRegion(format!(
                "region ({:.3}, {:.3}, {:.3}, {:.3}) lies outside the imagery footprint",
                rmin_x, rmin_y, rmax_x, rmax_y
            )));
        }

        let (row_lo, row_hi, col_lo, col_hi) =
            pixel_window(template, (rmin_x, rmin_y, rmax_x, rmax_y));

        for row in row_lo..row_hi {
            for col in col_lo..col_hi {
                let (x, y) = template.pixel_to_geo(col, row);
                if self.geometry.contains(&Point::new(x, y)) {
                    mask.set(row, col, true);
                }
            }
        }

        if mask.is_empty() {
            return Err(Error::MalformedRegion(
                "region does not cover any cell centre of the imagery grid".into(),
            ));
        }
        tracing::debug!(cells = mask.count_valid(), "rasterized study region");
        Ok(mask)
    }
}

/// Row/column window of `template` that can intersect `bounds`
fn pixel_window<T: RasterElement>(
    template: &Raster<T>,
    bounds: (f64, f64, f64, f64),
) -> (usize, usize, usize, usize) {
    let (rows, cols) = template.shape();
    let (min_x, min_y, max_x, max_y) = bounds;
    let corners = [
        template.geo_to_pixel(min_x, min_y),
        template.geo_to_pixel(min_x, max_y),
        template.geo_to_pixel(max_x, min_y),
        template.geo_to_pixel(max_x, max_y),
    ];
    if corners.iter().any(|(c, r)| !c.is_finite() || !r.is_finite()) {
        return (0, rows, 0, cols);
    }
    let clamp = |v: f64, hi: usize| v.max(0.0).min(hi as f64) as usize;
    let c_lo = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min).floor();
    let c_hi = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max).ceil();
    let r_lo = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min).floor();
    let r_hi = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max).ceil();
    (clamp(r_lo, rows), clamp(r_hi, rows), clamp(c_lo, cols), clamp(c_hi, cols))
}
