//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Aggregation and resampling work in `f64`; this trait provides the
/// conversions in both directions plus the no-data test.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// No-data value used when a band has none and one is needed
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert a resampled or aggregated f64 back to a cell value.
    ///
    /// Integer types round to nearest; values outside the type's range
    /// yield `None`.
    fn from_f64(value: f64) -> Option<Self>;
}

macro_rules! impl_raster_element_int {
    ($t:ty) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }

            fn is_float() -> bool {
                false
            }

            fn from_f64(value: f64) -> Option<Self> {
                if value.is_finite() {
                    NumCast::from(value.round())
                } else {
                    None
                }
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }

            fn is_float() -> bool {
                true
            }

            fn from_f64(value: f64) -> Option<Self> {
                NumCast::from(value)
            }
        }
    };
}

impl_raster_element_int!(i8);
impl_raster_element_int!(i16);
impl_raster_element_int!(i32);
impl_raster_element_int!(i64);
impl_raster_element_int!(u8);
impl_raster_element_int!(u16);
impl_raster_element_int!(u32);
impl_raster_element_int!(u64);
impl_raster_element_float!(f32);
impl_raster_element_float!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!((-9999.0_f64).is_nodata(Some(-9999.0)));
        assert!(!(1.0_f32).is_nodata(Some(-9999.0)));
    }

    #[test]
    fn test_int_nodata() {
        assert!(0_u8.is_nodata(Some(0)));
        assert!(!0_u8.is_nodata(None));
        assert_eq!(i16::default_nodata(), i16::MIN);
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(u8::from_f64(2.6), Some(3));
        assert_eq!(u8::from_f64(300.0), None);
        assert_eq!(i32::from_f64(f64::NAN), None);
        assert_eq!(f32::from_f64(1.5), Some(1.5));
    }
}
