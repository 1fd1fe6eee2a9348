//! Point-in-polygon classification by ray casting
//!
//! A horizontal ray from the query point toward +x is intersected with every
//! ring edge; an odd number of crossings means inside. Points on an edge are
//! reported separately so callers can treat the boundary as closed.

use geo_types::{Coord, LineString, Polygon};
use gridzone_core::BoundingBox;

/// Relative tolerance for "lies on an edge"
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Where a point sits relative to one ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RingPosition {
    Inside,
    Boundary,
    Outside,
}

/// Classify `(x, y)` against a ring. An unclosed ring is closed implicitly.
pub(crate) fn ring_position(ring: &LineString<f64>, x: f64, y: f64) -> RingPosition {
    let pts = &ring.0;
    let n = pts.len();
    if n == 0 {
        return RingPosition::Outside;
    }

    let mut inside = false;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];

        if on_segment(a, b, x, y) {
            return RingPosition::Boundary;
        }

        if (a.y > y) != (b.y > y) {
            let xi = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
            if x < xi {
                inside = !inside;
            }
        }
    }

    if inside {
        RingPosition::Inside
    } else {
        RingPosition::Outside
    }
}

fn on_segment(a: Coord<f64>, b: Coord<f64>, x: f64, y: f64) -> bool {
    let tol = BOUNDARY_EPSILON * (1.0 + x.abs().max(y.abs()));

    if x < a.x.min(b.x) - tol
        || x > a.x.max(b.x) + tol
        || y < a.y.min(b.y) - tol
        || y > a.y.max(b.y) + tol
    {
        return false;
    }

    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return (x - a.x).abs() <= tol && (y - a.y).abs() <= tol;
    }

    let cross = dx * (y - a.y) - dy * (x - a.x);
    (cross / len).abs() <= tol
}

/// Polygon with its extent precomputed, ready for many point queries
#[derive(Debug, Clone)]
pub(crate) struct PreparedPolygon<'a> {
    polygon: &'a Polygon<f64>,
    bbox: Option<BoundingBox>,
}

impl<'a> PreparedPolygon<'a> {
    pub(crate) fn new(polygon: &'a Polygon<f64>) -> Self {
        let bbox = BoundingBox::from_coords(polygon.exterior().0.iter().map(|c| (c.x, c.y)));
        Self { polygon, bbox }
    }

    pub(crate) fn bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    /// Closed-set membership: inside the exterior ring and not strictly
    /// inside any hole. Every ring edge counts as covered.
    pub(crate) fn covers(&self, x: f64, y: f64) -> bool {
        match self.bbox {
            Some(bb) if bb.contains_point(x, y) => {}
            _ => return false,
        }

        match ring_position(self.polygon.exterior(), x, y) {
            RingPosition::Outside => false,
            RingPosition::Boundary => true,
            RingPosition::Inside => self
                .polygon
                .interiors()
                .iter()
                .all(|hole| ring_position(hole, x, y) != RingPosition::Inside),
        }
    }
}
