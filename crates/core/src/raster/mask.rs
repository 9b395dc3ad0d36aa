//! Per-cell validity mask

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2, Zip};

/// Boolean validity grid parallel to a raster's values.
///
/// `true` marks a cell that carries a value; `false` is "no value". Masked
/// cells never take part in arithmetic or reductions, so the values stored
/// beneath them are irrelevant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    cells: Array2<bool>,
}

impl Mask {
    /// Mask with every cell valid
    pub fn all_valid(rows: usize, cols: usize) -> Self {
        Self {
            cells: Array2::from_elem((rows, cols), true),
        }
    }

    /// Mask with every cell invalid
    pub fn all_invalid(rows: usize, cols: usize) -> Self {
        Self {
            cells: Array2::from_elem((rows, cols), false),
        }
    }

    pub fn from_array(cells: Array2<bool>) -> Self {
        Self { cells }
    }

    /// Build a mask from a row-major vector of flags
    pub fn from_vec(cells: Vec<bool>, rows: usize, cols: usize) -> Result<Self> {
        if cells.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let cells = Array2::from_shape_vec((rows, cols), cells)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { cells })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn cols(&self) -> usize {
        self.cells.ncols()
    }

    /// Whether the cell at (row, col) is valid. Out-of-range cells are invalid.
    #[inline]
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.cells.get((row, col)).copied().unwrap_or(false)
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, valid: bool) {
        if let Some(cell) = self.cells.get_mut((row, col)) {
            *cell = valid;
        }
    }

    /// Number of valid cells
    pub fn count_valid(&self) -> usize {
        self.cells.iter().filter(|&&v| v).count()
    }

    /// True when no cell is valid
    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&v| v)
    }

    /// Logical AND with another mask of the same shape
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        self.check_shape(other)?;
        let cells = Zip::from(&self.cells)
            .and(&other.cells)
            .map_collect(|&a, &b| a && b);
        Ok(Mask { cells })
    }

    /// Logical AND with another mask, in place
    pub fn and_assign(&mut self, other: &Mask) -> Result<()> {
        self.check_shape(other)?;
        Zip::from(&mut self.cells)
            .and(&other.cells)
            .for_each(|a, &b| *a = *a && b);
        Ok(())
    }

    pub fn view(&self) -> ArrayView2<'_, bool> {
        self.cells.view()
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.cells
    }

    fn check_shape(&self, other: &Mask) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: other.rows(),
                ac: other.cols(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_combines_validity() {
        let a = Mask::from_vec(vec![true, true, false, false], 2, 2).unwrap();
        let b = Mask::from_vec(vec![true, false, true, false], 2, 2).unwrap();
        let c = a.and(&b).unwrap();
        assert!(c.is_valid(0, 0));
        assert!(!c.is_valid(0, 1));
        assert!(!c.is_valid(1, 0));
        assert!(!c.is_valid(1, 1));
        assert_eq!(c.count_valid(), 1);
    }

    #[test]
    fn test_and_shape_mismatch() {
        let a = Mask::all_valid(2, 2);
        let b = Mask::all_valid(3, 2);
        assert!(a.and(&b).is_err());
    }

    #[test]
    fn test_out_of_range_is_invalid() {
        let m = Mask::all_valid(2, 2);
        assert!(!m.is_valid(5, 0));
        assert!(Mask::all_invalid(3, 3).is_empty());
    }
}
