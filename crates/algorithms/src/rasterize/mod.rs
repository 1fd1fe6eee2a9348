//! Rasterization of vector geometries onto a grid
//!
//! Converts a [`Geometry`] into the set of cells it covers in a
//! [`GridGeometry`]:
//! - **Point**: the cell containing the point
//! - **Polygon**: cells whose center is inside (closed boundary, holes excluded)
//! - **LineString**: cells crossed by a zero-width grid traversal
//! - **Multi\***: union of the parts
//! - **Buffer**: cells whose center lies within a radius of a point
//!
//! Cell tests only visit the window of the grid under the geometry's
//! bounding box, never the whole raster.

mod line;
mod polygon;

use crate::maybe_rayon::*;
use geo_types::{Point, Polygon};
use gridzone_core::crs::ensure_same;
use gridzone_core::{BoundingBox, Error, Geometry, GridGeometry, Result, Shape, CRS};
use tracing::debug;

use polygon::PreparedPolygon;

/// One covered cell with its coverage fraction in `(0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoveredCell {
    pub row: usize,
    pub col: usize,
    pub weight: f64,
}

/// Cells of one grid covered by a geometry, in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMask {
    grid: GridGeometry,
    cells: Vec<CoveredCell>,
}

impl CoverageMask {
    /// Mask covering nothing
    pub fn empty(grid: GridGeometry) -> Self {
        Self { grid, cells: Vec::new() }
    }

    /// Build a mask from arbitrary cells.
    ///
    /// Cells are sorted row-major; duplicates keep the larger weight. Cells outside the grid or with non-positive weight are
    /// dropped.
    pub fn from_cells(grid: GridGeometry, cells: impl IntoIterator<Item = CoveredCell>) -> Self {
        let mut cells: Vec<CoveredCell> = cells
            .into_iter()
            .filter(|c| c.row < grid.rows() && c.col < grid.cols() && c.weight > 0.0)
            .map(|c| CoveredCell { weight: c.weight.min(1.0), ..c })
            .collect();
        cells.sort_by_key(|c| (c.row, c.col));

        let mut merged: Vec<CoveredCell> = Vec::with_capacity(cells.len());
        for cell in cells {
            match merged.last_mut() {
                Some(last) if (last.row, last.col) == (cell.row, cell.col) => {
                    last.weight = last.weight.max(cell.weight);
                }
                _ => merged.push(cell),
            }
        }

        Self { grid, cells: merged }
    }

    fn from_indices(grid: GridGeometry, indices: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self::from_cells(
            grid,
            indices.into_iter().map(|(row, col)| CoveredCell { row, col, weight: 1.0 }),
        )
    }

    /// Grid the mask was built for
    pub fn grid(&self) -> &GridGeometry {
        &self.grid
    }

    pub fn cells(&self) -> &[CoveredCell] {
        &self.cells
    }

    /// (row, col) pairs in row-major order
    pub fn indices(&self) -> Vec<(usize, usize)> {
        self.cells.iter().map(|c| (c.row, c.col)).collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.weight(row, col).is_some()
    }

    /// Coverage weight of a cell, `None` if not covered
    pub fn weight(&self, row: usize, col: usize) -> Option<f64> {
        self.cells
            .binary_search_by_key(&(row, col), |c| (c.row, c.col))
            .ok()
            .map(|i| self.cells[i].weight)
    }

    /// Sum of coverage weights (covered area in cells)
    pub fn total_weight(&self) -> f64 {
        self.cells.iter().map(|c| c.weight).sum()
    }

    /// Union of two masks on the same grid.
    ///
    /// A cell in both keeps the larger weight; for exact coverage of
    /// overlapping geometries rasterize them together as one multi-part
    /// geometry.
    pub fn union(&self, other: &CoverageMask) -> Result<CoverageMask> {
        if !self.grid.same_grid(&other.grid) {
            return Err(Error::GridMismatch);
        }
        Ok(Self::from_cells(
            self.grid,
            self.cells.iter().chain(other.cells.iter()).copied(),
        ))
    }
}

/// A zone whose membership can be tested at any world coordinate
enum Region<'a> {
    Polygon(PreparedPolygon<'a>),
    Circle { x: f64, y: f64, radius: f64 },
    /// Any of the parts
    Union(Vec<Region<'a>>),
}

impl Region<'_> {
    fn bbox(&self) -> Option<BoundingBox> {
        match self {
            Region::Polygon(p) => p.bbox(),
            Region::Circle { x, y, radius } => Some(BoundingBox::new(*x, *y, *x, *y).buffered(*radius)),
            Region::Union(parts) => parts
                .iter()
                .filter_map(Region::bbox)
                .reduce(|a, b| a.union(&b)),
        }
    }

    fn contains(&self, px: f64, py: f64) -> bool {
        match self {
            Region::Polygon(p) => p.covers(px, py),
            Region::Circle { x, y, radius } => (px - x).hypot(py - y) <= *radius,
            Region::Union(parts) => parts.iter().any(|part| part.contains(px, py)),
        }
    }

    /// Number of lattice probes of one cell that fall inside the region
    fn hits(&self, grid: &GridGeometry, row: usize, col: usize, offsets: &[f64]) -> usize {
        let mut hits = 0;
        for dr in offsets {
            for dc in offsets {
                let (x, y) = grid.fractional_to_world(row as f64 + dr, col as f64 + dc);
                if self.contains(x, y) {
                    hits += 1;
                }
            }
        }
        hits
    }
}

fn lattice(subdivisions: usize) -> Vec<f64> {
    let n = subdivisions.max(1);
    (0..n).map(|i| (i as f64 + 0.5) / n as f64).collect()
}

/// Sample a region over its grid window.
///
/// Each cell is probed on an `n x n` lattice of sub-cell centers; with
/// `n == 1` that is just the cell center and weights are 0 or 1.
///
/// A [`Region::Union`] is sampled part by part, each over its own window;
/// only cells reached by several parts are probed again against the whole
/// union, so overlapping parts never count a probe twice.
fn sample_region(region: &Region<'_>, grid: &GridGeometry, subdivisions: usize) -> Vec<CoveredCell> {
    if let Region::Union(parts) = region {
        return sample_union(region, parts, grid, subdivisions);
    }
    let Some((rows, cols)) = region.bbox().and_then(|bb| grid.window(&bb)) else {
        return Vec::new();
    };

    let offsets = lattice(subdivisions);
    let probes = (offsets.len() * offsets.len()) as f64;

    rows.into_par_iter()
        .flat_map(|row| {
            let mut row_cells = Vec::new();
            for col in cols.clone() {
                let hits = region.hits(grid, row, col, &offsets);
                if hits > 0 {
                    row_cells.push(CoveredCell { row, col, weight: hits as f64 / probes });
                }
            }
            row_cells
        })
        .collect()
}

fn sample_union(
    union: &Region<'_>,
    parts: &[Region<'_>],
    grid: &GridGeometry,
    subdivisions: usize,
) -> Vec<CoveredCell> {
    let mut cells: Vec<CoveredCell> = parts
        .iter()
        .flat_map(|part| sample_region(part, grid, subdivisions))
        .collect();
    cells.sort_by_key(|c| (c.row, c.col));

    let offsets = lattice(subdivisions);
    let probes = (offsets.len() * offsets.len()) as f64;
    let mut merged: Vec<CoveredCell> = Vec::with_capacity(cells.len());
    for cell in cells {
        match merged.last_mut() {
            Some(last) if (last.row, last.col) == (cell.row, cell.col) => {
                if last.weight < 1.0 {
                    last.weight = union.hits(grid, cell.row, cell.col, &offsets) as f64 / probes;
                }
            }
            _ => merged.push(cell),
        }
    }
    merged
}

fn validate_subdivisions(subdivisions: usize) -> Result<()> {
    if subdivisions == 0 {
        return Err(Error::invalid_parameter("subdivisions", subdivisions, "must be >= 1"));
    }
    Ok(())
}

fn validate_radius(radius: f64) -> Result<()> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(Error::invalid_parameter("radius", radius, "must be finite and >= 0"));
    }
    Ok(())
}

fn point_cell(grid: &GridGeometry, x: f64, y: f64) -> Option<(usize, usize)> {
    let (row, col) = grid.world_to_cell_unchecked(x, y);
    grid.checked_cell(row, col)
}

fn polygon_cells(poly: &Polygon<f64>, grid: &GridGeometry, subdivisions: usize) -> Vec<CoveredCell> {
    sample_region(&Region::Polygon(PreparedPolygon::new(poly)), grid, subdivisions)
}

fn circle_cells(centers: &[Point<f64>], radius: f64, grid: &GridGeometry, subdivisions: usize) -> Vec<CoveredCell> {
    let circles = centers
        .iter()
        .map(|p| Region::Circle { x: p.x(), y: p.y(), radius })
        .collect();
    sample_region(&Region::Union(circles), grid, subdivisions)
}

fn shape_cells(shape: &Shape, grid: &GridGeometry, subdivisions: usize) -> Vec<CoveredCell> {
    let full = |(row, col): (usize, usize)| CoveredCell { row, col, weight: 1.0 };
    match shape {
        Shape::Point(p) => point_cell(grid, p.x(), p.y()).map(full).into_iter().collect(),
        Shape::MultiPoint(mp) => mp
            .0
            .iter()
            .filter_map(|p| point_cell(grid, p.x(), p.y()))
            .map(full)
            .collect(),
        Shape::LineString(ls) => {
            let mut out = Vec::new();
            line::line_cells(ls, grid, &mut out);
            out.into_iter().map(full).collect()
        }
        Shape::Polygon(poly) => polygon_cells(poly, grid, subdivisions),
        Shape::MultiPolygon(mp) => {
            let parts = mp.0.iter().map(|poly| Region::Polygon(PreparedPolygon::new(poly))).collect();
            sample_region(&Region::Union(parts), grid, subdivisions)
        }
    }
}

/// Cells of `grid` covered by `geometry`.
///
/// `grid_crs` is the CRS of the raster the grid belongs to; it must be
/// equivalent to the geometry's CRS. Reproject the geometry first with
/// [`Geometry::reprojected`] when they differ.
///
/// # Errors
/// - `CrsUndefined` if either side has no CRS
/// - `CrsMismatch` if the CRS differ
pub fn cover_cells(geometry: &Geometry, grid: &GridGeometry, grid_crs: Option<&CRS>) -> Result<CoverageMask> {
    ensure_same(grid_crs, "raster", geometry.crs(), "geometry")?;

    let mask = CoverageMask::from_cells(*grid, shape_cells(geometry.shape(), grid, 1));
    debug!(kind = geometry.shape().kind(), cells = mask.len(), "rasterized geometry");
    Ok(mask)
}

/// Like [`cover_cells`], with fractional coverage weights.
///
/// Every cell under the geometry is probed on a `subdivisions x subdivisions`
/// lattice and weighted by the fraction of probes inside. Cells reached by
/// points and lines have weight 1.
pub fn cover_cells_weighted(
    geometry: &Geometry,
    grid: &GridGeometry,
    grid_crs: Option<&CRS>,
    subdivisions: usize,
) -> Result<CoverageMask> {
    ensure_same(grid_crs, "raster", geometry.crs(), "geometry")?;
    validate_subdivisions(subdivisions)?;

    let mask = CoverageMask::from_cells(*grid, shape_cells(geometry.shape(), grid, subdivisions));
    debug!(
        kind = geometry.shape().kind(),
        cells = mask.len(),
        area = mask.total_weight(),
        "rasterized geometry with coverage weights"
    );
    Ok(mask)
}

/// Cells whose center lies within `radius` (world units) of a point.
///
/// The distance is measured in world coordinates, so the zone stays circular
/// on grids with non-square cells. A MultiPoint yields the union of its
/// circles.
///
/// # Errors
/// - `InvalidParameter` for a negative or non-finite radius, or a geometry
///   that is not a Point/MultiPoint
/// - `CrsUndefined` / `CrsMismatch` as for [`cover_cells`]
pub fn cover_buffer(
    points: &Geometry,
    radius: f64,
    grid: &GridGeometry,
    grid_crs: Option<&CRS>,
) -> Result<CoverageMask> {
    cover_buffer_weighted(points, radius, grid, grid_crs, 1)
}

/// [`cover_buffer`] with fractional coverage weights
pub fn cover_buffer_weighted(
    points: &Geometry,
    radius: f64,
    grid: &GridGeometry,
    grid_crs: Option<&CRS>,
    subdivisions: usize,
) -> Result<CoverageMask> {
    ensure_same(grid_crs, "raster", points.crs(), "geometry")?;
    validate_radius(radius)?;
    validate_subdivisions(subdivisions)?;

    let centers = points.points()?;
    let mask = CoverageMask::from_cells(*grid, circle_cells(&centers, radius, grid, subdivisions));
    debug!(radius, cells = mask.len(), "rasterized point buffer");
    Ok(mask)
}

/// Buffer coverage around a single coordinate, already known to be in the
/// grid's CRS
pub(crate) fn buffer_mask(x: f64, y: f64, radius: f64, grid: &GridGeometry, subdivisions: usize) -> CoverageMask {
    let circle = Region::Circle { x, y, radius };
    CoverageMask::from_cells(*grid, sample_region(&circle, grid, subdivisions))
}

/// Mask from explicit (row, col) pairs, e.g. a selection made by the caller
pub fn mask_from_indices(grid: GridGeometry, indices: impl IntoIterator<Item = (usize, usize)>) -> CoverageMask {
    CoverageMask::from_indices(grid, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, MultiPolygon};

    fn crs() -> CRS {
        CRS::from_epsg(32633)
    }

    /// 4x4 unit grid with origin (0, 0) and rows growing toward +y
    fn grid_4x4() -> GridGeometry {
        GridGeometry::new(0.0, 0.0, 1.0, 1.0, 4, 4).unwrap()
    }

    fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Geometry {
        Geometry::rectangle(BoundingBox::new(min_x, min_y, max_x, max_y), crs())
    }

    fn multi_rect(parts: &[(f64, f64, f64, f64)]) -> Geometry {
        let polys = parts
            .iter()
            .map(|&(x0, y0, x1, y1)| {
                Polygon::new(LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]), vec![])
            })
            .collect();
        Geometry::new(Shape::MultiPolygon(MultiPolygon(polys)), Some(crs()))
    }

    #[test]
    fn test_lower_left_square() {
        let mask = cover_cells(&rect(0.0, 0.0, 2.0, 2.0), &grid_4x4(), Some(&crs())).unwrap();
        assert_eq!(mask.indices(), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_lower_left_square_north_up() {
        // Same world square on a north-up grid lands on the bottom rows
        let grid = GridGeometry::new(0.0, 4.0, 1.0, -1.0, 4, 4).unwrap();
        let mask = cover_cells(&rect(0.0, 0.0, 2.0, 2.0), &grid, Some(&crs())).unwrap();
        assert_eq!(mask.indices(), vec![(2, 0), (2, 1), (3, 0), (3, 1)]);
    }

    #[test]
    fn test_center_on_edge_is_covered() {
        // Square whose edges run through the centers of cells (0,0)..(1,1)
        let mask = cover_cells(&rect(0.5, 0.5, 1.5, 1.5), &grid_4x4(), Some(&crs())).unwrap();
        assert_eq!(mask.indices(), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);

        // Thin strip whose top edge runs through the row-0 centers
        let mask = cover_cells(&rect(0.5, 0.0, 1.5, 0.5), &grid_4x4(), Some(&crs())).unwrap();
        assert_eq!(mask.indices(), vec![(0, 0), (0, 1)]);
    }

    #[test]
    fn test_polygon_with_hole() {
        let grid = GridGeometry::new(0.0, 0.0, 1.0, 1.0, 6, 6).unwrap();
        let outer = LineString::from(vec![(0.0, 0.0), (6.0, 0.0), (6.0, 6.0), (0.0, 6.0), (0.0, 0.0)]);
        let hole = LineString::from(vec![(2.0, 2.0), (2.0, 4.0), (4.0, 4.0), (4.0, 2.0), (2.0, 2.0)]);
        let geom = Geometry::polygon(Polygon::new(outer, vec![hole]), crs());

        let mask = cover_cells(&geom, &grid, Some(&crs())).unwrap();
        assert_eq!(mask.len(), 36 - 4);
        assert!(!mask.contains(2, 2));
        assert!(!mask.contains(3, 3));
        assert!(mask.contains(1, 2));
    }

    #[test]
    fn test_point_inside_and_outside() {
        let grid = grid_4x4();
        let inside = Geometry::point(2.3, 1.7, crs());
        assert_eq!(cover_cells(&inside, &grid, Some(&crs())).unwrap().indices(), vec![(1, 2)]);

        let outside = Geometry::point(-0.5, 1.0, crs());
        assert!(cover_cells(&outside, &grid, Some(&crs())).unwrap().is_empty());
    }

    #[test]
    fn test_multipoint_union() {
        let geom = Geometry::multi_point([(0.5, 0.5), (0.6, 0.4), (3.5, 3.5)], crs());
        let mask = cover_cells(&geom, &grid_4x4(), Some(&crs())).unwrap();
        assert_eq!(mask.indices(), vec![(0, 0), (3, 3)]);
    }

    #[test]
    fn test_line_string() {
        let line = Geometry::line_string(LineString::from(vec![(0.5, 0.5), (3.5, 0.5), (3.5, 3.5)]), crs());
        let mask = cover_cells(&line, &grid_4x4(), Some(&crs())).unwrap();
        assert_eq!(mask.len(), 7);
        assert!(mask.contains(0, 0) && mask.contains(0, 3) && mask.contains(3, 3));
    }

    #[test]
    fn test_crs_checks() {
        let geom = Geometry::point(1.0, 1.0, CRS::wgs84());
        assert!(matches!(
            cover_cells(&geom, &grid_4x4(), Some(&crs())),
            Err(Error::CrsMismatch(_, _))
        ));
        assert_eq!(
            cover_cells(&geom, &grid_4x4(), None),
            Err(Error::CrsUndefined("raster"))
        );
    }

    #[test]
    fn test_buffer_non_square_cells() {
        // Cells twice as wide as tall: a circle must not turn into an ellipse in index space
        let grid = GridGeometry::new(0.0, 0.0, 2.0, 1.0, 11, 11).unwrap();
        let center = Geometry::point(11.0, 5.5, crs());
        let mask = cover_buffer(&center, 2.0, &grid, Some(&crs())).unwrap();

        // Cell centers sit at x = 1, 3, 5, ... and y = 0.5, 1.5, ...
        for cell in mask.cells() {
            let (x, y) = grid.cell_to_world(cell.row, cell.col);
            assert!((x - 11.0).hypot(y - 5.5) <= 2.0);
        }
        // Horizontal reach: x in {9, 11, 13}; vertical reach: y in 3.5..=7.5
        assert!(mask.contains(5, 4) && mask.contains(5, 6));
        assert!(!mask.contains(5, 3));
        assert!(mask.contains(3, 5) && mask.contains(7, 5));
        assert!(!mask.contains(2, 5));
    }

    #[test]
    fn test_buffer_rejects_bad_input() {
        let p = Geometry::point(1.0, 1.0, crs());
        assert!(cover_buffer(&p, -1.0, &grid_4x4(), Some(&crs())).is_err());
        assert!(cover_buffer(&p, f64::NAN, &grid_4x4(), Some(&crs())).is_err());
        assert!(cover_buffer(&rect(0.0, 0.0, 1.0, 1.0), 1.0, &grid_4x4(), Some(&crs())).is_err());
    }

    #[test]
    fn test_buffer_zero_radius_on_center() {
        let p = Geometry::point(1.5, 1.5, crs());
        let mask = cover_buffer(&p, 0.0, &grid_4x4(), Some(&crs())).unwrap();
        assert_eq!(mask.indices(), vec![(1, 1)]);
    }

    #[test]
    fn test_weighted_coverage() {
        let mask = cover_cells_weighted(&rect(0.0, 0.0, 1.5, 1.0), &grid_4x4(), Some(&crs()), 4).unwrap();
        assert_eq!(mask.weight(0, 0), Some(1.0));
        assert_eq!(mask.weight(0, 1), Some(0.5));
        assert!(!mask.contains(1, 0));
        assert!((mask.total_weight() - 1.5).abs() < 1e-12);

        assert!(cover_cells_weighted(&rect(0.0, 0.0, 1.0, 1.0), &grid_4x4(), Some(&crs()), 0).is_err());
    }

    #[test]
    fn test_mask_union_and_merge() {
        let grid = grid_4x4();
        let a = mask_from_indices(grid, [(0, 0), (1, 1)]);
        let b = mask_from_indices(grid, [(1, 1), (2, 2), (9, 9)]);
        let u = a.union(&b).unwrap();
        assert_eq!(u.indices(), vec![(0, 0), (1, 1), (2, 2)]);
        assert_eq!(u.weight(1, 1), Some(1.0));

        let other = mask_from_indices(GridGeometry::new(0.0, 0.0, 2.0, 2.0, 4, 4).unwrap(), [(0, 0)]);
        assert_eq!(a.union(&other), Err(Error::GridMismatch));
    }

    #[test]
    fn test_multipolygon_union() {
        let geom = multi_rect(&[(0.0, 0.0, 1.0, 1.0), (2.0, 2.0, 4.0, 4.0), (2.5, 2.5, 3.5, 3.5)]);
        let mask = cover_cells(&geom, &grid_4x4(), Some(&crs())).unwrap();
        assert_eq!(mask.indices(), vec![(0, 0), (2, 2), (2, 3), (3, 2), (3, 3)]);
        assert!(mask.cells().iter().all(|c| c.weight == 1.0));
    }

    #[test]
    fn test_weighted_multipolygon_overlap_counts_once() {
        let grid = grid_4x4();
        let same = multi_rect(&[(0.0, 0.0, 0.5, 1.0), (0.0, 0.0, 0.5, 1.0)]);
        let mask = cover_cells_weighted(&same, &grid, Some(&crs()), 4).unwrap();
        assert_eq!(mask.weight(0, 0), Some(0.5));

        // Parts cover x in [0, 0.5] and [0.25, 0.75]: the union is three quarters
        let shifted = multi_rect(&[(0.0, 0.0, 0.5, 1.0), (0.25, 0.0, 0.75, 1.0)]);
        let mask = cover_cells_weighted(&shifted, &grid, Some(&crs()), 4).unwrap();
        assert_eq!(mask.weight(0, 0), Some(0.75));
        assert_eq!(mask.len(), 1);
    }

    #[test]
    fn test_weighted_buffer_area() {
        let grid = GridGeometry::new(0.0, 0.0, 1.0, 1.0, 20, 20).unwrap();
        let center = Geometry::point(10.0, 10.0, crs());
        let mask = cover_buffer_weighted(&center, 5.0, &grid, Some(&crs()), 8).unwrap();

        let area = std::f64::consts::PI * 25.0;
        assert!((mask.total_weight() - area).abs() < 1.0, "{}", mask.total_weight());
        assert_eq!(mask.weight(10, 10), Some(1.0));
        assert!(mask.cells().iter().any(|c| c.weight < 1.0));

        // A repeated point is the same zone, not twice the coverage
        let twice = Geometry::multi_point([(10.0, 10.0), (10.0, 10.0)], crs());
        let doubled = cover_buffer_weighted(&twice, 5.0, &grid, Some(&crs()), 8).unwrap();
        assert_eq!(doubled, mask);
    }
}
