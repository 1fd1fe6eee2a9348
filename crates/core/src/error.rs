//! Error types for gridzone

use thiserror::Error;

/// Main error type for gridzone operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("CRS undefined for {0}")]
    CrsUndefined(&'static str),

    #[error("Cell out of bounds: ({row}, {col}) in grid of size ({rows}, {cols})")]
    OutOfBounds {
        row: i64,
        col: i64,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid range: rows {row_start}..{row_end}, cols {col_start}..{col_end} in grid of size ({rows}, {cols})")]
    InvalidRange {
        row_start: usize,
        row_end: usize,
        col_start: usize,
        col_end: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Geometry does not intersect the raster extent")]
    EmptyIntersection,

    #[error("Grid mismatch: rasters are not aligned on the same grid")]
    GridMismatch,

    #[error("Invalid raster dimensions: {bands}x{rows}x{cols}")]
    InvalidDimensions { bands: usize, rows: usize, cols: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Coordinate transform failed: {0}")]
    Transform(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for gridzone operations
pub type Result<T> = std::result::Result<T, Error>;
