//! Affine grid geometry: mapping between cell indices and world coordinates

use crate::bbox::BoundingBox;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Relative tolerance used when comparing two grids for alignment
const ALIGN_TOLERANCE: f64 = 1e-9;

/// Axis-aligned affine grid.
///
/// Converts between cell indices (row, col) and world coordinates (x, y):
/// ```text
/// x = origin_x + col * cell_width
/// y = origin_y + row * cell_height
/// ```
///
/// `cell_width` is always positive. The sign of `cell_height` fixes the row
/// direction: negative (the usual north-up layout) puts row 0 at the top,
/// positive puts row 0 at the bottom with rows growing toward +y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    origin_x: f64,
    origin_y: f64,
    cell_width: f64,
    cell_height: f64,
    rows: usize,
    cols: usize,
}

impl GridGeometry {
    /// Create a grid, validating `cell_width > 0`, `cell_height != 0` and a
    /// non-empty shape.
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        cell_width: f64,
        cell_height: f64,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        if !origin_x.is_finite() || !origin_y.is_finite() {
            return Err(Error::invalid_parameter(
                "origin",
                format!("({}, {})", origin_x, origin_y),
                "origin must be finite",
            ));
        }
        if !(cell_width.is_finite() && cell_width > 0.0) {
            return Err(Error::invalid_parameter(
                "cell_width",
                cell_width,
                "must be finite and > 0",
            ));
        }
        if !cell_height.is_finite() || cell_height == 0.0 {
            return Err(Error::invalid_parameter(
                "cell_height",
                cell_height,
                "must be finite and non-zero",
            ));
        }
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions { bands: 1, rows, cols });
        }

        Ok(Self {
            origin_x,
            origin_y,
            cell_width,
            cell_height,
            rows,
            cols,
        })
    }

    /// Create from a GDAL-style array
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    ///
    /// Rotated transforms are rejected.
    pub fn from_gdal(coeffs: [f64; 6], rows: usize, cols: usize) -> Result<Self> {
        if coeffs[2] != 0.0 || coeffs[4] != 0.0 {
            return Err(Error::invalid_parameter(
                "transform",
                format!("{:?}", coeffs),
                "rotated grids are not supported",
            ));
        }
        Self::new(coeffs[0], coeffs[3], coeffs[1], coeffs[5], rows, cols)
    }

    /// Convert to GDAL-style array
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.origin_x, self.cell_width, 0.0, self.origin_y, 0.0, self.cell_height]
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.origin_x, self.origin_y)
    }

    /// Cell size as (width, height); height keeps its sign
    pub fn cell_size(&self) -> (f64, f64) {
        (self.cell_width, self.cell_height)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// World coordinate of the center of cell (row, col)
    pub fn cell_to_world(&self, row: usize, col: usize) -> (f64, f64) {
        self.fractional_to_world(row as f64 + 0.5, col as f64 + 0.5)
    }

    /// World coordinate of a continuous cell position (row, col).
    ///
    /// Integer positions are cell corners, `.5` positions are centers.
    pub fn fractional_to_world(&self, row: f64, col: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.cell_width,
            self.origin_y + row * self.cell_height,
        )
    }

    /// Continuous cell position (row, col) of a world coordinate
    pub fn world_to_fractional(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (y - self.origin_y) / self.cell_height,
            (x - self.origin_x) / self.cell_width,
        )
    }

    /// Index of the cell containing (x, y), without bounds checks.
    ///
    /// Indices may be negative or past the edge; rasterization treats those
    /// as "no coverage".
    pub fn world_to_cell_unchecked(&self, x: f64, y: f64) -> (i64, i64) {
        let (row, col) = self.world_to_fractional(x, y);
        (row.floor() as i64, col.floor() as i64)
    }

    /// Index of the cell containing (x, y).
    ///
    /// Fails with `OutOfBounds` outside `[0, rows) x [0, cols)`.
    pub fn world_to_cell(&self, x: f64, y: f64) -> Result<(usize, usize)> {
        let (row, col) = self.world_to_cell_unchecked(x, y);
        self.checked_cell(row, col).ok_or(Error::OutOfBounds {
            row,
            col,
            rows: self.rows,
            cols: self.cols,
        })
    }

    /// Convert a signed index to an in-grid one
    pub fn checked_cell(&self, row: i64, col: i64) -> Option<(usize, usize)> {
        if row < 0 || col < 0 || row as usize >= self.rows || col as usize >= self.cols {
            None
        } else {
            Some((row as usize, col as usize))
        }
    }

    /// Grid restricted to `rows` x `cols`, with the origin moved to the first
    /// kept cell.
    pub fn sub_grid(&self, rows: Range<usize>, cols: Range<usize>) -> Result<GridGeometry> {
        if rows.is_empty() || cols.is_empty() || rows.end > self.rows || cols.end > self.cols {
            return Err(Error::InvalidRange {
                row_start: rows.start,
                row_end: rows.end,
                col_start: cols.start,
                col_end: cols.end,
                rows: self.rows,
                cols: self.cols,
            });
        }

        let (origin_x, origin_y) = self.fractional_to_world(rows.start as f64, cols.start as f64);
        Ok(GridGeometry {
            origin_x,
            origin_y,
            cell_width: self.cell_width,
            cell_height: self.cell_height,
            rows: rows.len(),
            cols: cols.len(),
        })
    }

    /// Outer extent of the grid
    pub fn bounds(&self) -> BoundingBox {
        let (x0, y0) = self.fractional_to_world(0.0, 0.0);
        let (x1, y1) = self.fractional_to_world(self.rows as f64, self.cols as f64);
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Cells whose extent intersects `bbox`, as clamped (row range, col range).
    ///
    /// `None` when the box lies entirely outside the grid. A degenerate box
    /// (a point or a line) still selects the cell(s) it touches.
    pub fn window(&self, bbox: &BoundingBox) -> Option<(Range<usize>, Range<usize>)> {
        let overlap = self.bounds().intersection(bbox)?;
        let (row_a, col_a) = self.world_to_fractional(overlap.min_x, overlap.min_y);
        let (row_b, col_b) = self.world_to_fractional(overlap.max_x, overlap.max_y);

        Some((
            span(row_a.min(row_b), row_a.max(row_b), self.rows),
            span(col_a.min(col_b), col_a.max(col_b), self.cols),
        ))
    }

    /// Whether two grids describe the same cells
    pub fn same_grid(&self, other: &GridGeometry) -> bool {
        let tol_x = self.cell_width.abs() * ALIGN_TOLERANCE;
        let tol_y = self.cell_height.abs() * ALIGN_TOLERANCE;
        self.rows == other.rows
            && self.cols == other.cols
            && (self.origin_x - other.origin_x).abs() <= tol_x
            && (self.origin_y - other.origin_y).abs() <= tol_y
            && (self.cell_width - other.cell_width).abs() <= tol_x
            && (self.cell_height - other.cell_height).abs() <= tol_y
    }
}

/// Half-open index range covering `[lo, hi]` in cell units, clamped to `0..n`
fn span(lo: f64, hi: f64, n: usize) -> Range<usize> {
    let start = (lo.floor().max(0.0) as usize).min(n - 1);
    let end = (hi.ceil().max(0.0) as usize).clamp(start + 1, n);
    start..end
}
