//! Main Raster type

use crate::bbox::BoundingBox;
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GridGeometry, RasterElement};
use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use std::ops::Range;

/// A georeferenced multi-band raster.
///
/// Cells are stored band-major as a `bands x rows x cols` array. Every band
/// shares one [`GridGeometry`]; each band may carry its own no-data value.
///
/// Rasters are values: operations return new rasters and there is no
/// in-place cell setter. The `with_*` builders consume `self`.
///
/// # Example
///
/// ```
/// use gridzone_core::{GridGeometry, Raster, CRS};
///
/// let grid = GridGeometry::new(0.0, 10.0, 1.0, -1.0, 10, 10)?;
/// let raster = Raster::filled(1, grid, 0.0_f64)
///     .with_crs(CRS::from_epsg(32633))
///     .with_nodata(Some(-9999.0));
/// assert_eq!(raster.shape(), (1, 10, 10));
/// # Ok::<(), gridzone_core::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array3<T>,
    grid: GridGeometry,
    crs: Option<CRS>,
    nodata: Vec<Option<T>>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a raster with every cell of every band set to `value`
    pub fn filled(bands: usize, grid: GridGeometry, value: T) -> Self {
        let bands = bands.max(1);
        Self {
            data: Array3::from_elem((bands, grid.rows(), grid.cols()), value),
            grid,
            crs: None,
            nodata: vec![None; bands],
        }
    }

    /// Create a raster from a `bands x rows x cols` array
    pub fn from_array(data: Array3<T>, grid: GridGeometry) -> Result<Self> {
        let (bands, rows, cols) = data.dim();
        if bands == 0 || (rows, cols) != grid.shape() {
            return Err(Error::InvalidDimensions { bands, rows, cols });
        }
        Ok(Self {
            data,
            grid,
            crs: None,
            nodata: vec![None; bands],
        })
    }

    /// Create a single-band raster from a `rows x cols` array
    pub fn from_band(data: Array2<T>, grid: GridGeometry) -> Result<Self> {
        Self::from_array(data.insert_axis(Axis(0)), grid)
    }

    /// Create a raster from band-major, row-major data
    pub fn from_vec(data: Vec<T>, bands: usize, grid: GridGeometry) -> Result<Self> {
        let (rows, cols) = grid.shape();
        if bands == 0 || data.len() != bands * rows * cols {
            return Err(Error::InvalidDimensions { bands, rows, cols });
        }
        let array = Array3::from_shape_vec((bands, rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Self::from_array(array, grid)
    }

    /// Attach a CRS
    pub fn with_crs(mut self, crs: CRS) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Set the same no-data value on every band
    pub fn with_nodata(mut self, nodata: Option<T>) -> Self {
        self.nodata.iter_mut().for_each(|nd| *nd = nodata);
        self
    }

    /// Set the no-data value of one band
    pub fn with_band_nodata(mut self, band: usize, nodata: Option<T>) -> Result<Self> {
        let bands = self.bands();
        let slot = self.nodata.get_mut(band).ok_or_else(|| {
            Error::invalid_parameter("band", band, format!("raster has {} bands", bands))
        })?;
        *slot = nodata;
        Ok(self)
    }

    /// New raster with this raster's grid, CRS and no-data but different cells.
    ///
    /// `data` must have the same shape as this raster.
    pub fn with_data(&self, data: Array3<T>) -> Result<Self> {
        if data.dim() != self.data.dim() {
            let (bands, rows, cols) = data.dim();
            return Err(Error::InvalidDimensions { bands, rows, cols });
        }
        Ok(Self {
            data,
            grid: self.grid,
            crs: self.crs.clone(),
            nodata: self.nodata.clone(),
        })
    }

    // Dimensions

    pub fn bands(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    /// Dimensions as (bands, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    // Data access

    /// Get value at (band, row, col)
    pub fn get(&self, band: usize, row: usize, col: usize) -> Result<T> {
        self.data
            .get((band, row, col))
            .copied()
            .ok_or(Error::OutOfBounds {
                row: row as i64,
                col: col as i64,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// View of one band
    pub fn band(&self, band: usize) -> Result<ArrayView2<'_, T>> {
        if band >= self.bands() {
            return Err(Error::invalid_parameter(
                "band",
                band,
                format!("raster has {} bands", self.bands()),
            ));
        }
        Ok(self.data.index_axis(Axis(0), band))
    }

    /// Reference to the underlying `bands x rows x cols` array
    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    /// Consume the raster and return the underlying array
    pub fn into_array(self) -> Array3<T> {
        self.data
    }

    /// Raster restricted to a window of rows and columns, all bands sliced
    /// identically.
    pub fn sub_raster(&self, rows: Range<usize>, cols: Range<usize>) -> Result<Self> {
        let grid = self.grid.sub_grid(rows.clone(), cols.clone())?;
        let data = self.data.slice(s![.., rows, cols]).to_owned();
        Ok(Self {
            data,
            grid,
            crs: self.crs.clone(),
            nodata: self.nodata.clone(),
        })
    }

    // Metadata

    pub fn grid(&self) -> &GridGeometry {
        &self.grid
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// No-data value of `band` (`None` also for an unknown band)
    pub fn nodata(&self, band: usize) -> Option<T> {
        self.nodata.get(band).copied().flatten()
    }

    /// No-data values of all bands
    pub fn nodata_values(&self) -> &[Option<T>] {
        &self.nodata
    }

    /// Outer extent in world coordinates
    pub fn bounds(&self) -> BoundingBox {
        self.grid.bounds()
    }

    // Value checks

    /// Check if a value is no-data for `band`
    pub fn is_nodata(&self, band: usize, value: T) -> bool {
        value.is_nodata(self.nodata(band))
    }

    /// Check if cell (band, row, col) contains no-data
    pub fn is_nodata_at(&self, band: usize, row: usize, col: usize) -> Result<bool> {
        let value = self.get(band, row, col)?;
        Ok(self.is_nodata(band, value))
    }

    /// Value at a cell as f64, or `None` for no-data
    pub fn valid_f64(&self, band: usize, row: usize, col: usize) -> Option<f64> {
        let value = *self.data.get((band, row, col))?;
        if self.is_nodata(band, value) {
            None
        } else {
            value.to_f64()
        }
    }
}

impl<T: RasterElement> PartialEq for Raster<T> {
    fn eq(&self, other: &Self) -> bool {
        self.grid.same_grid(&other.grid)
            && self.crs == other.crs
            && self.nodata == other.nodata
            && self.data == other.data
    }
}
