//! # gridzone core
//!
//! Core types for the gridzone raster/vector geoprocessing library.
//!
//! This crate provides:
//! - `GridGeometry`: affine mapping between cell indices and world coordinates
//! - `Raster<T>`: immutable multi-band raster bound to a grid and a CRS
//! - `Geometry`: tagged vector shapes that carry their own CRS
//! - `CRS` and the `CoordinateTransform` seam for crossing between systems
//! - Algorithm trait for consistent API

pub mod bbox;
pub mod crs;
pub mod error;
pub mod raster;
pub mod transform;
pub mod vector;

pub use bbox::BoundingBox;
pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GridGeometry, Raster, RasterElement};
pub use transform::{CoordinateTransform, IdentityTransform};
pub use vector::{AttributeValue, Feature, Geometry, Shape};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bbox::BoundingBox;
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GridGeometry, Raster, RasterElement};
    pub use crate::transform::{CoordinateTransform, IdentityTransform};
    pub use crate::vector::{Feature, Geometry, Shape};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in gridzone.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
