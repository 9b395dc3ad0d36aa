//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Mask, RasterElement};
use ndarray::{Array2, ArrayView2};

/// A georeferenced 2D raster grid with an explicit validity mask.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform and CRS) and a parallel [`Mask`].
/// A cell whose mask entry is `false` has no value; its stored number is
/// never read by any algorithm.
///
/// # Example
///
/// ```ignore
/// use landheat_core::Raster;
///
/// let mut raster: Raster<f64> = Raster::new(100, 100);
/// raster.set(10, 20, 42.0)?;
/// raster.set_invalid(10, 21);
///
/// assert_eq!(raster.value(10, 20), Some(42.0));
/// assert_eq!(raster.value(10, 21), None);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Per-cell validity
    mask: Mask,
    /// Affine transformation
    transform: GeoTransform,
    /// Coordinate reference system
    crs: Option<CRS>,
    /// No-data value declared by the source file, if any
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros, every cell valid
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value, every cell valid
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray, every cell valid
    pub fn from_array(data: Array2<T>) -> Self {
        let (rows, cols) = data.dim();
        Self {
            data,
            mask: Mask::all_valid(rows, cols),
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Build a raster on this raster's grid (transform and CRS) from new
    /// values and a new mask.
    pub fn with_values<U: RasterElement>(&self, data: Array2<U>, mask: Mask) -> Result<Raster<U>> {
        if data.dim() != self.shape() {
            let (ar, ac) = data.dim();
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar,
                ac,
            });
        }
        if mask.shape() != self.shape() {
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: mask.rows(),
                ac: mask.cols(),
            });
        }
        Ok(Raster {
            data,
            mask,
            transform: self.transform,
            crs: self.crs,
            nodata: None,
        })
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Stored value at (row, col), regardless of validity
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Value at (row, col), or `None` for an invalid or out-of-range cell
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> Option<T> {
        if self.mask.is_valid(row, col) {
            self.data.get((row, col)).copied()
        } else {
            None
        }
    }

    /// Set value at (row, col) and mark the cell valid
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        self.mask.set(row, col, true);
        Ok(())
    }

    /// Mark the cell at (row, col) as "no value"
    pub fn set_invalid(&mut self, row: usize, col: usize) {
        self.mask.set(row, col, false);
    }

    /// Whether the cell at (row, col) carries a value
    #[inline]
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.mask.is_valid(row, col)
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    // Validity

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Return a copy whose mask is this mask AND `mask`
    pub fn masked(&self, mask: &Mask) -> Result<Self> {
        let mut out = self.clone();
        out.mask.and_assign(mask)?;
        Ok(out)
    }

    /// Number of valid cells
    pub fn valid_count(&self) -> usize {
        self.mask.count_valid()
    }

    /// Invalidate every cell whose value matches the declared no-data value
    /// or is NaN.
    pub fn mask_nodata(&mut self) {
        let nodata = self.nodata;
        for ((row, col), value) in self.data.indexed_iter() {
            if value.is_nodata(nodata) {
                self.mask.set(row, col, false);
            }
        }
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Convert pixel coordinates to geographic coordinates (cell centre)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Convert geographic coordinates to pixel coordinates
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    /// Check that `other` lies on exactly the same grid: shape, transform and CRS.
    pub fn check_aligned<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: other.rows(),
                ac: other.cols(),
            });
        }
        if !self.transform.is_aligned(other.transform()) {
            return Err(Error::GeometryMismatch(format!(
                "{:?} vs {:?}",
                self.transform.to_gdal(),
                other.transform().to_gdal()
            )));
        }
        if let (Some(a), Some(b)) = (self.crs(), other.crs())
            && !a.is_equivalent(b)
        {
            return Err(Error::CrsMismatch(a.to_string(), b.to_string()));
        }
        Ok(())
    }

    // Statistics

    /// Calculate basic statistics over valid cells (min, max, mean, counts)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for ((row, col), &value) in self.data.indexed_iter() {
            if !self.mask.is_valid(row, col) {
                continue;
            }

            if min.is_none_or(|m| value < m) {
                min = Some(value);
            }
            if max.is_none_or(|m| value > m) {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
