//! Zero-width line rasterization
//!
//! Walks the grid cells crossed by each segment (Amanatides & Woo, 1987),
//! stepping to whichever cell boundary the segment reaches next.

use geo_types::{Coord, LineString};
use gridzone_core::GridGeometry;

/// Append every in-grid cell crossed by `line` to `out`
pub(crate) fn line_cells(line: &LineString<f64>, grid: &GridGeometry, out: &mut Vec<(usize, usize)>) {
    match line.0.as_slice() {
        [] => {}
        [single] => segment_cells(*single, *single, grid, out),
        coords => {
            for pair in coords.windows(2) {
                segment_cells(pair[0], pair[1], grid, out);
            }
        }
    }
}

fn segment_cells(a: Coord<f64>, b: Coord<f64>, grid: &GridGeometry, out: &mut Vec<(usize, usize)>) {
    let (r0, c0) = grid.world_to_fractional(a.x, a.y);
    let (r1, c1) = grid.world_to_fractional(b.x, b.y);
    if ![r0, c0, r1, c1].iter().all(|v| v.is_finite()) {
        return;
    }

    let extent = [grid.rows() as f64, grid.cols() as f64];
    let Some((start, end)) = clip_segment([r0, c0], [r1, c1], extent) else {
        return;
    };

    let mut row = Axis::new(start[0], end[0]);
    let mut col = Axis::new(start[1], end[1]);

    let mut visit = |row: i64, col: i64| {
        if let Some(cell) = grid.checked_cell(row, col) {
            out.push(cell);
        }
    };

    visit(row.cell, col.cell);
    while row.remaining > 0 || col.remaining > 0 {
        if col.remaining > 0 && (row.remaining == 0 || col.next < row.next) {
            col.advance();
        } else {
            row.advance();
        }
        visit(row.cell, col.cell);
    }
}

/// Clip a segment in fractional cell space to `[0, rows] x [0, cols]`.
///
/// Cut points are interpolated from the endpoint that is already inside, and
/// the clipped coordinate is set exactly on the boundary.
fn clip_segment(mut a: [f64; 2], mut b: [f64; 2], extent: [f64; 2]) -> Option<([f64; 2], [f64; 2])> {
    for axis in 0..2 {
        for (bound, below) in [(0.0, true), (extent[axis], false)] {
            let outside = |p: &[f64; 2]| if below { p[axis] < bound } else { p[axis] > bound };
            match (outside(&a), outside(&b)) {
                (true, true) => return None,
                (true, false) => a = cut(b, a, axis, bound),
                (false, true) => b = cut(a, b, axis, bound),
                (false, false) => {}
            }
        }
    }
    Some((a, b))
}

/// Point where the segment from `inside` to `outside` meets `p[axis] == bound`
fn cut(inside: [f64; 2], outside: [f64; 2], axis: usize, bound: f64) -> [f64; 2] {
    let other = 1 - axis;
    let t = (bound - inside[axis]) / (outside[axis] - inside[axis]);
    let mut p = inside;
    p[axis] = bound;
    p[other] = inside[other] + t * (outside[other] - inside[other]);
    p
}

/// Walk state along one axis of a clipped segment
struct Axis {
    cell: i64,
    step: i64,
    /// Cell boundaries still to cross
    remaining: i64,
    /// Segment parameter of the next boundary crossing
    next: f64,
    /// Parameter distance between boundaries
    delta: f64,
}

impl Axis {
    /// Start and end cells are the ones whose interior the segment enters
    /// and leaves through, so an endpoint lying on a cell edge does not pull
    /// in the cell it only touches.
    fn new(start: f64, end: f64) -> Self {
        let d = end - start;
        if d > 0.0 {
            let cell = start.floor();
            let last = (end.ceil() - 1.0).max(cell);
            Self {
                cell: cell as i64,
                step: 1,
                remaining: (last - cell) as i64,
                next: (cell + 1.0 - start) / d,
                delta: 1.0 / d,
            }
        } else if d < 0.0 {
            let cell = start.ceil() - 1.0;
            let last = end.floor().min(cell);
            Self {
                cell: cell as i64,
                step: -1,
                remaining: (cell - last) as i64,
                next: (start - cell) / -d,
                delta: -1.0 / d,
            }
        } else {
            Self {
                cell: start.floor() as i64,
                step: 0,
                remaining: 0,
                next: f64::INFINITY,
                delta: f64::INFINITY,
            }
        }
    }

    fn advance(&mut self) {
        self.cell += self.step;
        self.next += self.delta;
        self.remaining -= 1;
    }
}
