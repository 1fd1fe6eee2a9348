//! # gridzone algorithms
//!
//! Raster/vector geoprocessing on top of `gridzone-core`.
//!
//! ## Available Algorithm Categories
//!
//! - **rasterize**: Cells covered by points, lines, polygons and point buffers
//! - **statistics**: Zonal extraction and aggregation
//! - **clip**: Crop and mask rasters by geometries
//! - **warp**: Reprojection with nearest and bilinear resampling
//! - **imagery**: Band math on aligned rasters

pub mod clip;
pub mod imagery;
pub mod rasterize;
pub mod statistics;
pub mod warp;

pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::clip::{crop, crop_all, crop_and_mask, mask, Crop, CropParams, EmptyPolicy};
    pub use crate::imagery::{band_math_binary, BandMathOp};
    pub use crate::rasterize::{
        cover_buffer, cover_buffer_weighted, cover_cells, cover_cells_weighted, CoverageMask, CoveredCell,
    };
    pub use crate::statistics::{
        reduce, reduce_with_buffer, values, zonal_statistics, Aggregate, BandValue, FeatureStatistics,
        Reduction, ZonalParams, ZonalResult, ZonalStatistics,
    };
    pub use crate::warp::{reproject, reproject_like, Reproject, ReprojectParams, Resampling};
    pub use gridzone_core::prelude::*;
}
