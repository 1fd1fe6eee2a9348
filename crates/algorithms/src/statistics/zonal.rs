//! Zonal statistics
//!
//! Extracts and aggregates the raster values that fall inside a zone. A zone
//! is a [`CoverageMask`] produced by the rasterizer, so the same code serves
//! polygons, lines, points and point buffers.
//! No-data cells never contribute to any statistic.

use crate::clip::EmptyPolicy;
use crate::maybe_rayon::*;
use crate::rasterize::{buffer_mask, cover_cells, cover_cells_weighted, CoverageMask};
use gridzone_core::crs::ensure_same;
use gridzone_core::raster::{Raster, RasterElement};
use gridzone_core::{Algorithm, Error, Feature, Geometry, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Aggregation applied per band over the cells of a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    #[default]
    Mean,
    Sum,
    Min,
    Max,
    Count,
    /// No aggregation: return every valid value with its position
    None,
    /// Mean weighted by cell coverage
    WeightedMean,
    /// Sum weighted by cell coverage
    WeightedSum,
}

/// One extracted cell value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandValue {
    pub band: usize,
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Per-band aggregate; `NoData` when nothing contributed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    Value(f64),
    NoData,
}

impl Aggregate {
    pub fn as_option(&self) -> Option<f64> {
        match self {
            Aggregate::Value(v) => Some(*v),
            Aggregate::NoData => None,
        }
    }

    pub fn is_nodata(&self) -> bool {
        matches!(self, Aggregate::NoData)
    }
}

/// Outcome of a reduction over one zone
#[derive(Debug, Clone, PartialEq)]
pub enum ZonalResult {
    /// One aggregate per band
    Bands(Vec<Aggregate>),
    /// Raw values, for [`Reduction::None`]
    Values(Vec<BandValue>),
}

impl ZonalResult {
    /// Aggregates per band, `None` for a raw-values result
    pub fn bands(&self) -> Option<&[Aggregate]> {
        match self {
            ZonalResult::Bands(b) => Some(b),
            ZonalResult::Values(_) => None,
        }
    }
}

/// Parameters for per-feature zonal statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonalParams {
    /// What to do with a feature that misses the raster entirely
    pub empty_policy: EmptyPolicy,
    /// Sub-samples per cell side; above 1 enables fractional coverage weights
    pub subdivisions: usize,
}

impl Default for ZonalParams {
    fn default() -> Self {
        Self {
            empty_policy: EmptyPolicy::Error,
            subdivisions: 1,
        }
    }
}

/// Statistics of one feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStatistics {
    /// Position of the feature in the input slice
    pub index: usize,
    pub id: Option<String>,
    pub result: ZonalResult,
}

#[derive(Debug, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
    weighted_sum: f64,
    weight: f64,
}

impl Accumulator {
    fn push(&mut self, value: f64, weight: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
        self.weighted_sum += value * weight;
        self.weight += weight;
    }

    fn finish(&self, op: Reduction) -> Aggregate {
        if op == Reduction::Count {
            return Aggregate::Value(self.count as f64);
        }
        if self.count == 0 {
            return Aggregate::NoData;
        }
        match op {
            Reduction::Mean => Aggregate::Value(self.sum / self.count as f64),
            Reduction::Sum => Aggregate::Value(self.sum),
            Reduction::Min => Aggregate::Value(self.min),
            Reduction::Max => Aggregate::Value(self.max),
            Reduction::WeightedSum => Aggregate::Value(self.weighted_sum),
            Reduction::WeightedMean => Aggregate::Value(self.weighted_sum / self.weight),
            Reduction::Count | Reduction::None => Aggregate::NoData,
        }
    }
}

fn check_grid<T: RasterElement>(raster: &Raster<T>, mask: &CoverageMask) -> Result<()> {
    if !raster.grid().same_grid(mask.grid()) {
        return Err(Error::GridMismatch);
    }
    Ok(())
}

fn collect_values<T: RasterElement>(raster: &Raster<T>, mask: &CoverageMask) -> Vec<BandValue> {
    let bands = raster.bands();
    let mut out = Vec::with_capacity(mask.len() * bands);
    for cell in mask.cells() {
        for band in 0..bands {
            if let Some(value) = raster.valid_f64(band, cell.row, cell.col) {
                out.push(BandValue {
                    band,
                    row: cell.row,
                    col: cell.col,
                    value,
                });
            }
        }
    }
    out
}

fn reduce_unchecked<T: RasterElement>(raster: &Raster<T>, mask: &CoverageMask, op: Reduction) -> ZonalResult {
    if op == Reduction::None {
        return ZonalResult::Values(collect_values(raster, mask));
    }

    let aggregates = (0..raster.bands())
        .map(|band| {
            let mut acc = Accumulator::default();
            for cell in mask.cells() {
                if let Some(value) = raster.valid_f64(band, cell.row, cell.col) {
                    acc.push(value, cell.weight);
                }
            }
            acc.finish(op)
        })
        .collect();
    ZonalResult::Bands(aggregates)
}

/// Every valid value under `mask`.
///
/// Ordered by row, then column, then band. No-data cells are left out.
///
/// # Errors
/// `GridMismatch` if the mask was built for another grid
pub fn values<T: RasterElement>(raster: &Raster<T>, mask: &CoverageMask) -> Result<Vec<BandValue>> {
    check_grid(raster, mask)?;
    Ok(collect_values(raster, mask))
}

/// Reduce the values under `mask` with `op`, one aggregate per band.
///
/// A band without contributing cells reports [`Aggregate::NoData`], except
/// for [`Reduction::Count`] which reports 0.
///
/// # Errors
/// `GridMismatch` if the mask was built for another grid
pub fn reduce<T: RasterElement>(raster: &Raster<T>, mask: &CoverageMask, op: Reduction) -> Result<ZonalResult> {
    check_grid(raster, mask)?;
    let result = reduce_unchecked(raster, mask, op);
    debug!(?op, cells = mask.len(), bands = raster.bands(), "reduced zone");
    Ok(result)
}

/// Reduce a circular buffer around each point.
///
/// Returns one result per point, in input order. A buffer reaching past the
/// grid edge aggregates the cells that are inside; one that covers nothing
/// yields no-data for every band.
///
/// # Arguments
/// * `raster` - Values to aggregate
/// * `points` - Point or MultiPoint geometry in the raster's CRS
/// * `radius` - Buffer radius in world units
/// * `op` - Reduction applied to each buffer
pub fn reduce_with_buffer<T: RasterElement>(
    raster: &Raster<T>,
    points: &Geometry,
    radius: f64,
    op: Reduction,
) -> Result<Vec<ZonalResult>> {
    ensure_same(raster.crs(), "raster", points.crs(), "geometry")?;
    if !radius.is_finite() || radius < 0.0 {
        return Err(Error::invalid_parameter("radius", radius, "must be finite and >= 0"));
    }

    let coords: Vec<(f64, f64)> = points.points()?.iter().map(|p| (p.x(), p.y())).collect();
    let grid = *raster.grid();

    let results: Vec<ZonalResult> = coords
        .into_par_iter()
        .map(|(x, y)| {
            let mask = buffer_mask(x, y, radius, &grid, 1);
            if mask.is_empty() {
                trace!(x, y, radius, "buffer covers no cells");
            }
            reduce_unchecked(raster, &mask, op)
        })
        .collect();

    debug!(points = results.len(), radius, ?op, "reduced point buffers");
    Ok(results)
}

/// Reduce each feature's zone, keeping the feature id.
///
/// Feature geometries must be in the raster's CRS; a missing or different
/// CRS fails the call under either policy. A feature whose extent misses the
/// raster fails with `EmptyIntersection`, or is left out of the output under
/// [`EmptyPolicy::Skip`].
pub fn zonal_statistics<T: RasterElement>(
    raster: &Raster<T>,
    features: &[Feature],
    op: Reduction,
    params: &ZonalParams,
) -> Result<Vec<FeatureStatistics>> {
    let bounds = raster.bounds();
    let mut out = Vec::with_capacity(features.len());

    for (index, feature) in features.iter().enumerate() {
        let geometry = &feature.geometry;
        ensure_same(raster.crs(), "raster", geometry.crs(), "geometry")?;
        let overlaps = geometry
            .bounding_box()
            .is_some_and(|bb| bb.intersects(&bounds));

        if !overlaps {
            match params.empty_policy {
                EmptyPolicy::Error => return Err(Error::EmptyIntersection),
                EmptyPolicy::Skip => {
                    trace!(index, id = ?feature.id, "feature outside raster, skipped");
                    continue;
                }
            }
        }

        let mask = if params.subdivisions > 1 {
            cover_cells_weighted(geometry, raster.grid(), raster.crs(), params.subdivisions)?
        } else {
            cover_cells(geometry, raster.grid(), raster.crs())?
        };

        out.push(FeatureStatistics {
            index,
            id: feature.id.clone(),
            result: reduce_unchecked(raster, &mask, op),
        });
    }

    debug!(features = features.len(), reported = out.len(), ?op, "zonal statistics");
    Ok(out)
}

/// Zonal statistics algorithm over a feature collection
#[derive(Debug, Clone, Default)]
pub struct ZonalStatistics {
    pub op: Reduction,
}

impl Algorithm for ZonalStatistics {
    type Input = (Raster<f64>, Vec<Feature>);
    type Output = Vec<FeatureStatistics>;
    type Params = ZonalParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ZonalStatistics"
    }

    fn description(&self) -> &'static str {
        "Aggregate raster values inside each feature geometry"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (raster, features) = input;
        zonal_statistics(&raster, &features, self.op, &params)
    }
}
