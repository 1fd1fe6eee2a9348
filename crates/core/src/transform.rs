//! Coordinate transforms between reference systems
//!
//! gridzone does not resolve CRS definitions itself. Operations that cross
//! CRS boundaries take a [`CoordinateTransform`] supplied by the caller.

use crate::crs::CRS;
use crate::error::{Error, Result};

/// Point transform between two CRS.
///
/// Implementations must be safe to call concurrently; reprojection calls
/// them from worker threads.
pub trait CoordinateTransform: Send + Sync {
    /// Transform `(x, y)` from `from` into `to`
    fn transform(&self, x: f64, y: f64, from: &CRS, to: &CRS) -> Result<(f64, f64)>;
}

/// Transform that only supports equivalent CRS.
///
/// Use it when every input is already in one CRS; any real cross-CRS request
/// fails with `CrsMismatch` instead of passing coordinates through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl CoordinateTransform for IdentityTransform {
    fn transform(&self, x: f64, y: f64, from: &CRS, to: &CRS) -> Result<(f64, f64)> {
        if from.is_equivalent(to) {
            Ok((x, y))
        } else {
            Err(Error::CrsMismatch(from.identifier(), to.identifier()))
        }
    }
}

impl<F> CoordinateTransform for F
where
    F: Fn(f64, f64, &CRS, &CRS) -> Result<(f64, f64)> + Send + Sync,
{
    fn transform(&self, x: f64, y: f64, from: &CRS, to: &CRS) -> Result<(f64, f64)> {
        self(x, y, from, to)
    }
}

#[cfg(feature = "proj4rs")]
pub use proj4::Proj4Transform;

#[cfg(feature = "proj4rs")]
mod proj4 {
    use super::CoordinateTransform;
    use crate::crs::CRS;
    use crate::error::{Error, Result};
    use proj4rs::proj::Proj;
    use std::cell::RefCell;

    /// Pure-Rust transform backed by `proj4rs`.
    ///
    /// EPSG handles are resolved through the `crs-definitions` database;
    /// PROJ strings are used as-is. WKT is not supported. The parsed
    /// projections of the most recent CRS pair are kept per thread.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Proj4Transform;

    fn proj_string(crs: &CRS) -> Result<String> {
        match crs {
            CRS::Epsg(code) => u16::try_from(*code)
                .ok()
                .and_then(crs_definitions::from_code)
                .map(|def| def.proj4.to_string())
                .ok_or_else(|| {
                    Error::Transform(format!("EPSG:{} is not in the crs-definitions database", code))
                }),
            CRS::Proj(proj) => Ok(proj.clone()),
            CRS::Wkt(_) => Err(Error::Transform(
                "WKT definitions are not supported by the proj4rs backend".to_string(),
            )),
        }
    }

    fn is_geographic(definition: &str) -> bool {
        definition.contains("+proj=longlat") || definition.contains("+proj=latlong")
    }

    /// Parsed source and target projections for one CRS pair
    struct ProjPair {
        from: CRS,
        to: CRS,
        source: Proj,
        target: Proj,
        source_geographic: bool,
        target_geographic: bool,
    }

    impl ProjPair {
        fn new(from: &CRS, to: &CRS) -> Result<Self> {
            let source_def = proj_string(from)?;
            let target_def = proj_string(to)?;
            let source = Proj::from_proj_string(&source_def)
                .map_err(|e| Error::Transform(format!("Invalid source projection {}: {:?}", from, e)))?;
            let target = Proj::from_proj_string(&target_def)
                .map_err(|e| Error::Transform(format!("Invalid target projection {}: {:?}", to, e)))?;

            Ok(Self {
                from: from.clone(),
                to: to.clone(),
                source,
                target,
                source_geographic: is_geographic(&source_def),
                target_geographic: is_geographic(&target_def),
            })
        }

        fn matches(&self, from: &CRS, to: &CRS) -> bool {
            self.from == *from && self.to == *to
        }

        fn apply(&self, x: f64, y: f64) -> Result<(f64, f64)> {
            // proj4rs works in radians for geographic coordinates
            let mut point = if self.source_geographic {
                (x.to_radians(), y.to_radians(), 0.0)
            } else {
                (x, y, 0.0)
            };

            proj4rs::transform::transform(&self.source, &self.target, &mut point)
                .map_err(|e| Error::Transform(format!("{} -> {}: {:?}", self.from, self.to, e)))?;

            if self.target_geographic {
                Ok((point.0.to_degrees(), point.1.to_degrees()))
            } else {
                Ok((point.0, point.1))
            }
        }
    }

    thread_local! {
        // Last pair used on this thread; a warp calls the transform once per
        // target cell with the same pair
        static LAST_PAIR: RefCell<Option<ProjPair>> = RefCell::new(None);
    }

    impl CoordinateTransform for Proj4Transform {
        fn transform(&self, x: f64, y: f64, from: &CRS, to: &CRS) -> Result<(f64, f64)> {
            if from.is_equivalent(to) {
                return Ok((x, y));
            }

            LAST_PAIR.with(|cell| {
                let mut cached = cell.borrow_mut();
                if let Some(pair) = cached.as_ref().filter(|p| p.matches(from, to)) {
                    return pair.apply(x, y);
                }
                let pair = ProjPair::new(from, to)?;
                let out = pair.apply(x, y);
                *cached = Some(pair);
                out
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use approx::assert_relative_eq;

        #[test]
        fn test_lon_lat_to_mercator_origin() {
            let (x, y) = Proj4Transform
                .transform(0.0, 0.0, &CRS::wgs84(), &CRS::web_mercator())
                .unwrap();
            assert_relative_eq!(x, 0.0, epsilon = 1e-6);
            assert_relative_eq!(y, 0.0, epsilon = 1e-6);
        }

        #[test]
        fn test_alternating_pairs() {
            let (x, y) = Proj4Transform
                .transform(10.0, 45.0, &CRS::wgs84(), &CRS::web_mercator())
                .unwrap();
            let (lon, lat) = Proj4Transform
                .transform(x, y, &CRS::web_mercator(), &CRS::wgs84())
                .unwrap();
            assert_relative_eq!(lon, 10.0, epsilon = 1e-9);
            assert_relative_eq!(lat, 45.0, epsilon = 1e-9);

            let again = Proj4Transform
                .transform(10.0, 45.0, &CRS::wgs84(), &CRS::web_mercator())
                .unwrap();
            assert_eq!(again, (x, y));
        }

        #[test]
        fn test_wkt_rejected() {
            let wkt = CRS::from_wkt("GEOGCS[\"WGS 84\"]");
            assert!(Proj4Transform.transform(0.0, 0.0, &wkt, &CRS::wgs84()).is_err());
        }
    }
}
