//! Reprojection and resampling onto a target grid
//!
//! Inverse mapping: every target cell center is transformed back into the
//! source CRS and the source raster is sampled there. Target rows are
//! processed in parallel.

mod resample;

use crate::maybe_rayon::*;
use gridzone_core::raster::{Raster, RasterElement};
use gridzone_core::{Algorithm, CoordinateTransform, Error, GridGeometry, IdentityTransform, Result, CRS};
use ndarray::{Array3, ArrayView2};
use resample::Sample;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Resampling kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    /// Value of the closest source cell center
    #[default]
    Nearest,
    /// Distance-weighted mean of the four surrounding centers
    Bilinear,
}

/// Parameters for reprojection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprojectParams {
    pub resampling: Resampling,
    /// Fill value for bands whose source has no no-data value
    pub nodata: Option<f64>,
}

/// Per-row output: band-major values plus bookkeeping
struct RowOutput<T> {
    values: Vec<T>,
    on_grid: usize,
    failed: usize,
}

/// Reproject `source` onto `target_grid` in `target_crs`.
///
/// # Arguments
/// * `source` - Raster to resample; its CRS must be set
/// * `target_grid` - Grid of the output raster
/// * `target_crs` - CRS the target grid is expressed in
/// * `params` - Resampling kernel and fallback no-data value
/// * `transform` - Point transform, called from target to source CRS
///
/// # Returns
/// Raster on `target_grid` with the source's band count. Each band's
/// no-data value is the source band's, else `params.nodata`, else
/// `T::default_nodata()`. Cells whose transform fails are no-data.
///
/// # Errors
/// - `CrsUndefined` if the source or target CRS is missing
/// - `EmptyIntersection` if no target cell maps inside the source grid
pub fn reproject<T: RasterElement>(
    source: &Raster<T>,
    target_grid: &GridGeometry,
    target_crs: Option<&CRS>,
    params: &ReprojectParams,
    transform: &dyn CoordinateTransform,
) -> Result<Raster<T>> {
    let src_crs = source.crs().ok_or(Error::CrsUndefined("source"))?;
    let dst_crs = target_crs.ok_or(Error::CrsUndefined("target"))?;
    let same_crs = src_crs.is_equivalent(dst_crs);

    let bands = source.bands();
    let (rows, cols) = target_grid.shape();
    let src_grid = *source.grid();

    let fills: Vec<T> = (0..bands)
        .map(|b| {
            source
                .nodata(b)
                .or_else(|| params.nodata.and_then(T::from_f64))
                .unwrap_or_else(T::default_nodata)
        })
        .collect();
    let views: Vec<ArrayView2<'_, T>> = (0..bands).map(|b| source.band(b)).collect::<Result<_>>()?;
    let sample: fn(&ArrayView2<'_, T>, Option<T>, f64, f64) -> Sample<T> = match params.resampling {
        Resampling::Nearest => resample::nearest::<T>,
        Resampling::Bilinear => resample::bilinear::<T>,
    };

    debug!(
        src = ?source.shape(),
        dst_rows = rows,
        dst_cols = cols,
        same_crs,
        resampling = ?params.resampling,
        "reprojecting raster"
    );

    let row_outputs: Vec<RowOutput<T>> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut out = RowOutput {
                values: Vec::with_capacity(bands * cols),
                on_grid: 0,
                failed: 0,
            };
            for b in 0..bands {
                out.values.extend(std::iter::repeat(fills[b]).take(cols));
            }

            for col in 0..cols {
                let (x, y) = target_grid.cell_to_world(row, col);
                let src_xy = if same_crs {
                    Ok((x, y))
                } else {
                    transform.transform(x, y, dst_crs, src_crs)
                };
                let (sx, sy) = match src_xy {
                    Ok(xy) => xy,
                    Err(_) => {
                        out.failed += 1;
                        continue;
                    }
                };

                let (row_f, col_f) = src_grid.world_to_fractional(sx, sy);
                for (b, view) in views.iter().enumerate() {
                    match sample(view, source.nodata(b), row_f, col_f) {
                        Sample::Outside => break,
                        Sample::NoData => {}
                        Sample::Value(v) => out.values[b * cols + col] = v,
                    }
                    if b == 0 {
                        out.on_grid += 1;
                    }
                }
            }
            out
        })
        .collect();

    let on_grid: usize = row_outputs.iter().map(|r| r.on_grid).sum();
    let failed: usize = row_outputs.iter().map(|r| r.failed).sum();
    if failed > 0 {
        warn!(failed, from = %dst_crs, to = %src_crs, "coordinate transform failed for some cells");
    }
    if on_grid == 0 {
        return Err(Error::EmptyIntersection);
    }

    let data = Array3::from_shape_fn((bands, rows, cols), |(b, r, c)| {
        row_outputs[r].values[b * cols + c]
    });

    let mut output = Raster::from_array(data, *target_grid)?.with_crs(dst_crs.clone());
    for (b, fill) in fills.into_iter().enumerate() {
        output = output.with_band_nodata(b, Some(fill))?;
    }
    debug!(cells_on_source = on_grid, "reprojection done");
    Ok(output)
}

/// Reproject `source` onto the grid and CRS of `template`
pub fn reproject_like<T: RasterElement, U: RasterElement>(
    source: &Raster<T>,
    template: &Raster<U>,
    params: &ReprojectParams,
    transform: &dyn CoordinateTransform,
) -> Result<Raster<T>> {
    reproject(source, template.grid(), template.crs(), params, transform)
}

/// Reprojection algorithm onto a fixed target grid
#[derive(Debug, Clone)]
pub struct Reproject<C = IdentityTransform> {
    pub target_grid: GridGeometry,
    pub target_crs: CRS,
    pub transform: C,
}

impl Reproject {
    /// Same-CRS resampling onto `target_grid`
    pub fn resample(target_grid: GridGeometry, crs: CRS) -> Self {
        Self {
            target_grid,
            target_crs: crs,
            transform: IdentityTransform,
        }
    }
}

impl<C: CoordinateTransform> Algorithm for Reproject<C> {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ReprojectParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Reproject"
    }

    fn description(&self) -> &'static str {
        "Reproject and resample a raster onto a target grid and CRS"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        reproject(
            &input,
            &self.target_grid,
            Some(&self.target_crs),
            &params,
            &self.transform,
        )
    }
}
