//! Statistical analysis algorithms for raster data
//!
//! - **zonal**: Extraction and aggregation of values inside vector zones

pub mod zonal;

pub use zonal::{
    reduce, reduce_with_buffer, values, zonal_statistics, Aggregate, BandValue, FeatureStatistics, Reduction,
    ZonalParams, ZonalResult, ZonalStatistics,
};
