//! Raster data structures

mod element;
mod grid;
mod grid_geometry;

pub use element::RasterElement;
pub use grid::Raster;
pub use grid_geometry::GridGeometry;
