//! Band math on aligned rasters
//!
//! Cell-by-cell arithmetic between two rasters that share a grid and a CRS.
//! Rasters on different grids must be aligned first with
//! [`reproject_like`](crate::warp::reproject_like).

use crate::maybe_rayon::*;
use gridzone_core::crs::ensure_same;
use gridzone_core::raster::{Raster, RasterElement};
use gridzone_core::{Error, Result};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Binary operations for band math
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandMathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
}

impl BandMathOp {
    fn apply(self, va: f64, vb: f64) -> f64 {
        match self {
            BandMathOp::Add => va + vb,
            BandMathOp::Subtract => va - vb,
            BandMathOp::Multiply => va * vb,
            BandMathOp::Divide => {
                if vb.abs() < 1e-10 {
                    f64::NAN
                } else {
                    va / vb
                }
            }
            BandMathOp::Min => va.min(vb),
            BandMathOp::Max => va.max(vb),
        }
    }
}

/// Apply a binary operation between two rasters element-wise, band by band.
///
/// No-data in either input produces NaN in the output, as does division by
/// zero. The output has NaN as no-data on every band.
///
/// # Arguments
/// * `a` - First raster
/// * `b` - Second raster, on the same grid and CRS as `a`
/// * `op` - Operation to apply
///
/// # Errors
/// - `CrsUndefined` / `CrsMismatch` unless both CRS are set and equivalent
/// - `GridMismatch` if the grids differ
/// - `InvalidDimensions` if the band counts differ
pub fn band_math_binary<A: RasterElement, B: RasterElement>(
    a: &Raster<A>,
    b: &Raster<B>,
    op: BandMathOp,
) -> Result<Raster<f64>> {
    ensure_same(a.crs(), "left raster", b.crs(), "right raster")?;
    if !a.grid().same_grid(b.grid()) {
        return Err(Error::GridMismatch);
    }
    if a.bands() != b.bands() {
        let (bands, rows, cols) = b.shape();
        return Err(Error::InvalidDimensions { bands, rows, cols });
    }

    let (bands, rows, cols) = a.shape();
    debug!(bands, rows, cols, ?op, "band math");

    let data: Vec<f64> = (0..bands * rows)
        .into_par_iter()
        .flat_map(|idx| {
            let (band, row) = (idx / rows, idx % rows);
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if let (Some(va), Some(vb)) = (a.valid_f64(band, row, col), b.valid_f64(band, row, col)) {
                    *out = op.apply(va, vb);
                }
            }
            row_data
        })
        .collect();

    let array = Array3::from_shape_vec((bands, rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    let mut output = Raster::from_array(array, *a.grid())?.with_nodata(Some(f64::NAN));
    if let Some(crs) = a.crs() {
        output = output.with_crs(crs.clone());
    }
    Ok(output)
}
