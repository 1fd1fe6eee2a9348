//! Cropping and masking rasters by vector geometries
//!
//! [`crop`] cuts a raster down to the cells under a geometry's bounding box.
//! [`mask`] and [`crop_and_mask`] additionally blank the cells that fall
//! outside the geometry itself.

use crate::rasterize::{cover_cells, CoverageMask};
use gridzone_core::raster::{Raster, RasterElement};
use gridzone_core::{Algorithm, CoordinateTransform, Error, Geometry, IdentityTransform, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// What to do when a geometry does not overlap the raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyPolicy {
    /// Fail with `EmptyIntersection`
    #[default]
    Error,
    /// Leave the geometry out and carry on
    Skip,
}

/// Parameters for cropping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CropParams {
    pub empty_policy: EmptyPolicy,
    /// Also blank cells outside the geometry (see [`crop_and_mask`])
    pub exact: bool,
}

/// Crop a raster to the bounding box of a geometry.
///
/// The geometry is moved into the raster's CRS through `transform` when the
/// two differ, then its bounding box is intersected with the raster extent.
/// Every cell touched by the intersection is kept, in all bands. Cells
/// inside the box but outside the geometry keep their values.
///
/// # Errors
/// - `CrsUndefined` if the raster or the geometry has no CRS
/// - `EmptyIntersection` if the geometry misses the raster entirely
pub fn crop<T: RasterElement>(
    raster: &Raster<T>,
    geometry: &Geometry,
    transform: &dyn CoordinateTransform,
) -> Result<Raster<T>> {
    let target = raster.crs().ok_or(Error::CrsUndefined("raster"))?;
    let geometry = geometry.reprojected(target, transform)?;

    let bbox = geometry.bounding_box().ok_or(Error::EmptyIntersection)?;
    let overlap = bbox.intersection(&raster.bounds()).ok_or(Error::EmptyIntersection)?;
    let (rows, cols) = raster.grid().window(&overlap).ok_or(Error::EmptyIntersection)?;

    debug!(
        rows = ?rows,
        cols = ?cols,
        src_rows = raster.rows(),
        src_cols = raster.cols(),
        "cropping raster"
    );
    raster.sub_raster(rows, cols)
}

/// Crop a raster once per geometry.
///
/// With [`EmptyPolicy::Skip`] a geometry that misses the raster yields
/// `None` in its slot; with [`EmptyPolicy::Error`] the first miss fails the
/// whole call.
pub fn crop_all<T: RasterElement>(
    raster: &Raster<T>,
    geometries: &[Geometry],
    params: &CropParams,
    transform: &dyn CoordinateTransform,
) -> Result<Vec<Option<Raster<T>>>> {
    geometries
        .iter()
        .enumerate()
        .map(|(index, geometry)| {
            let cropped = if params.exact {
                crop_and_mask(raster, geometry, transform)
            } else {
                crop(raster, geometry, transform)
            };
            match (cropped, params.empty_policy) {
                (Ok(r), _) => Ok(Some(r)),
                (Err(Error::EmptyIntersection), EmptyPolicy::Skip) => {
                    trace!(index, "geometry outside raster, skipped");
                    Ok(None)
                }
                (Err(e), _) => Err(e),
            }
        })
        .collect()
}

/// Blank every cell not covered by `coverage`.
///
/// Uncovered cells are set to each band's no-data value. A band without one
/// gets `T::default_nodata()`, which is then recorded on the output band.
///
/// # Errors
/// `GridMismatch` if the mask was built for a different grid
pub fn mask<T: RasterElement>(raster: &Raster<T>, coverage: &CoverageMask) -> Result<Raster<T>> {
    if !raster.grid().same_grid(coverage.grid()) {
        return Err(Error::GridMismatch);
    }

    let fills: Vec<T> = (0..raster.bands())
        .map(|b| raster.nodata(b).unwrap_or_else(T::default_nodata))
        .collect();

    let mut data = raster.data().clone();
    for (band, mut plane) in data.outer_iter_mut().enumerate() {
        let fill = fills[band];
        for ((row, col), value) in plane.indexed_iter_mut() {
            if !coverage.contains(row, col) {
                *value = fill;
            }
        }
    }

    let mut out = raster.with_data(data)?;
    for (band, fill) in fills.into_iter().enumerate() {
        out = out.with_band_nodata(band, Some(fill))?;
    }
    debug!(covered = coverage.len(), cells = raster.grid().cell_count(), "masked raster");
    Ok(out)
}

/// Crop to the geometry's bounding box, then blank the cells outside it
pub fn crop_and_mask<T: RasterElement>(
    raster: &Raster<T>,
    geometry: &Geometry,
    transform: &dyn CoordinateTransform,
) -> Result<Raster<T>> {
    let cropped = crop(raster, geometry, transform)?;
    let target = cropped.crs().ok_or(Error::CrsUndefined("raster"))?;
    let geometry = geometry.reprojected(target, transform)?;
    let coverage = cover_cells(&geometry, cropped.grid(), cropped.crs())?;
    mask(&cropped, &coverage)
}

/// Crop algorithm
///
/// Returns `None` when the geometry misses the raster and the policy is
/// [`EmptyPolicy::Skip`].
#[derive(Debug, Clone, Default)]
pub struct Crop<C = IdentityTransform> {
    pub transform: C,
}

impl<C: CoordinateTransform> Algorithm for Crop<C> {
    type Input = (Raster<f64>, Geometry);
    type Output = Option<Raster<f64>>;
    type Params = CropParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Crop"
    }

    fn description(&self) -> &'static str {
        "Crop a raster to the extent of a vector geometry"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (raster, geometry) = input;
        let mut out = crop_all(&raster, std::slice::from_ref(&geometry), &params, &self.transform)?;
        Ok(out.pop().flatten())
    }
}
