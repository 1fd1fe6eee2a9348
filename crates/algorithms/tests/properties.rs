//! Cross-module properties of cropping, rasterization, aggregation and
//! reprojection.

use approx::assert_relative_eq;
use geo_types::{LineString, Polygon};
use gridzone_algorithms::prelude::*;
use ndarray::Array3;

fn utm() -> CRS {
    CRS::from_epsg(32633)
}

/// North-up 20x30 raster with two bands of distinct, NaN-free values
fn dem() -> Raster<f64> {
    let grid = GridGeometry::new(500_000.0, 4_100_000.0, 30.0, -30.0, 20, 30).unwrap();
    let data = Array3::from_shape_fn((2, 20, 30), |(b, r, c)| {
        let base = (r * 30 + c) as f64;
        let variation = ((r * 7 + c * 13) % 100) as f64 / 10.0;
        base + variation + b as f64 * 1000.0
    });
    Raster::from_array(data, grid).unwrap().with_crs(utm()).with_nodata(Some(-9999.0))
}

fn triangle(x0: f64, y0: f64, size: f64) -> Geometry {
    let ring = LineString::from(vec![(x0, y0), (x0 + size, y0), (x0 + size / 2.0, y0 + size), (x0, y0)]);
    Geometry::polygon(Polygon::new(ring, vec![]), utm())
}

#[test]
fn crop_is_idempotent() {
    let r = dem();
    let geoms = [
        triangle(500_100.0, 4_099_700.0, 250.0),
        Geometry::rectangle(BoundingBox::new(500_017.0, 4_099_433.0, 500_611.0, 4_100_500.0), utm()),
        Geometry::point(500_455.0, 4_099_800.0, utm()),
        Geometry::rectangle(BoundingBox::new(499_000.0, 3_000_000.0, 600_000.0, 5_000_000.0), utm()),
    ];

    for g in &geoms {
        let once = crop(&r, g, &IdentityTransform).unwrap();
        let twice = crop(&once, g, &IdentityTransform).unwrap();
        assert_eq!(once, twice);
    }
}

#[test]
fn buffer_coverage_is_monotone_in_radius() {
    let r = dem();
    let center = Geometry::point(500_433.0, 4_099_777.0, utm());
    let radii = [0.0, 10.0, 29.9, 30.0, 45.0, 75.5, 120.0, 400.0];

    for pair in radii.windows(2) {
        let small = cover_buffer(&center, pair[0], r.grid(), r.crs()).unwrap();
        let large = cover_buffer(&center, pair[1], r.grid(), r.crs()).unwrap();
        assert!(small.len() <= large.len());
        for cell in small.cells() {
            assert!(large.contains(cell.row, cell.col), "r={} cell {:?}", pair[1], cell);
        }
    }
}

#[test]
fn mean_equals_sum_over_count() {
    let r = dem();
    let zones = [
        triangle(500_100.0, 4_099_700.0, 250.0),
        Geometry::rectangle(BoundingBox::new(500_000.0, 4_099_400.0, 500_900.0, 4_100_000.0), utm()),
        Geometry::line_string(LineString::from(vec![(500_005.0, 4_099_405.0), (500_895.0, 4_099_995.0)]), utm()),
    ];

    for zone in &zones {
        let mask = cover_cells(zone, r.grid(), r.crs()).unwrap();
        assert!(!mask.is_empty());
        let get = |op| reduce(&r, &mask, op).unwrap().bands().unwrap().to_vec();
        let (mean, sum, count) = (get(Reduction::Mean), get(Reduction::Sum), get(Reduction::Count));

        for b in 0..r.bands() {
            let sum = sum[b].as_option().unwrap();
            let count = count[b].as_option().unwrap();
            assert_relative_eq!(mean[b].as_option().unwrap(), sum / count, max_relative = 1e-12);
        }
    }
}

#[test]
fn empty_mask_counts_zero() {
    let r = dem();
    let mask = cover_cells(&Geometry::point(0.0, 0.0, utm()), r.grid(), r.crs()).unwrap();
    assert!(mask.is_empty());

    let count = reduce(&r, &mask, Reduction::Count).unwrap();
    assert_eq!(count, ZonalResult::Bands(vec![Aggregate::Value(0.0); 2]));
    for op in [Reduction::Mean, Reduction::Sum, Reduction::Min, Reduction::Max] {
        assert_eq!(reduce(&r, &mask, op).unwrap(), ZonalResult::Bands(vec![Aggregate::NoData; 2]));
    }
}

#[test]
fn identity_reprojection_reproduces_cells() {
    let r = dem();
    let out = reproject_like(&r, &r, &ReprojectParams::default(), &IdentityTransform).unwrap();
    assert_eq!(out, r);

    let grid = GridGeometry::new(0.0, 0.0, 2.0, 3.0, 7, 5).unwrap();
    let ints = Raster::from_array(Array3::from_shape_fn((1, 7, 5), |(_, r, c)| (r * 5 + c) as i32), grid)
        .unwrap()
        .with_crs(utm())
        .with_nodata(Some(-1));
    let out = reproject(&ints, &grid, Some(&utm()), &ReprojectParams::default(), &IdentityTransform).unwrap();
    assert_eq!(out, ints);
}

#[test]
fn closed_boundary_through_centers() {
    let grid = GridGeometry::new(0.0, 0.0, 1.0, 1.0, 4, 4).unwrap();
    let square = Geometry::rectangle(BoundingBox::new(1.5, 1.5, 2.5, 2.5), utm());
    let mask = cover_cells(&square, &grid, Some(&utm())).unwrap();
    assert_eq!(mask.indices(), vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
}

#[test]
fn lower_left_square_on_positive_sy_grid() {
    let grid = GridGeometry::new(0.0, 0.0, 1.0, 1.0, 4, 4).unwrap();
    let ring = LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]);
    let poly = Geometry::polygon(Polygon::new(ring, vec![]), utm());

    let mask = cover_cells(&poly, &grid, Some(&utm())).unwrap();
    assert_eq!(mask.indices(), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
}

fn brute_force_buffer(grid: &GridGeometry, x: f64, y: f64, radius: f64) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let (cx, cy) = grid.cell_to_world(row, col);
            if (cx - x).hypot(cy - y) <= radius {
                out.push((row, col));
            }
        }
    }
    out
}

#[test]
fn buffer_matches_brute_force() {
    // Center point on a cell center, radius one and a half cells
    let grid = GridGeometry::new(0.0, 0.0, 0.25, 0.25, 9, 9).unwrap();
    let (x, y) = grid.cell_to_world(4, 4);
    let radius = 1.5 * 0.25;

    let mask = cover_buffer(&Geometry::point(x, y, utm()), radius, &grid, Some(&utm())).unwrap();
    assert_eq!(mask.indices(), brute_force_buffer(&grid, x, y, radius));
    assert_eq!(mask.len(), 9);

    // Off-center point on an even grid
    let grid = GridGeometry::new(10.0, 20.0, 0.25, -0.25, 8, 8).unwrap();
    let (x, y) = (10.93, 19.08);
    let mask = cover_buffer(&Geometry::point(x, y, utm()), radius, &grid, Some(&utm())).unwrap();
    assert_eq!(mask.indices(), brute_force_buffer(&grid, x, y, radius));
}

#[test]
fn buffer_zonal_matches_mask_reduction() {
    let r = dem();
    let points = Geometry::multi_point([(500_433.0, 4_099_777.0), (500_015.0, 4_099_990.0)], utm());
    let results = reduce_with_buffer(&r, &points, 70.0, Reduction::Sum).unwrap();

    for (i, p) in points.points().unwrap().iter().enumerate() {
        let single = Geometry::point(p.x(), p.y(), utm());
        let mask = cover_buffer(&single, 70.0, r.grid(), r.crs()).unwrap();
        assert_eq!(results[i], reduce(&r, &mask, Reduction::Sum).unwrap());
    }
}

#[test]
fn exact_crop_then_zonal_agree() {
    let r = dem();
    let zone = triangle(500_100.0, 4_099_700.0, 250.0);

    let masked = crop_and_mask(&r, &zone, &IdentityTransform).unwrap();
    let in_crop = cover_cells(&zone, masked.grid(), masked.crs()).unwrap();
    let in_full = cover_cells(&zone, r.grid(), r.crs()).unwrap();
    assert_eq!(in_crop.len(), in_full.len());

    assert_eq!(
        reduce(&masked, &in_crop, Reduction::Sum).unwrap(),
        reduce(&r, &in_full, Reduction::Sum).unwrap()
    );
}
