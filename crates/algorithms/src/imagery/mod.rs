//! Imagery analysis algorithms
//!
//! - Band math: cell-by-cell arithmetic between aligned rasters

mod band_math;

pub use band_math::{band_math_binary, BandMathOp};
