//! Benchmarks for rasterization and zonal statistics

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo_types::{LineString, Polygon};
use gridzone_algorithms::rasterize::{cover_buffer, cover_cells};
use gridzone_algorithms::statistics::{reduce, reduce_with_buffer, Reduction};
use gridzone_core::{Geometry, GridGeometry, Raster, CRS};
use ndarray::Array3;

fn create_raster(size: usize) -> Raster<f64> {
    let grid = GridGeometry::new(0.0, size as f64, 1.0, -1.0, size, size).unwrap();
    let data = Array3::from_shape_fn((1, size, size), |(_, row, col)| {
        let base = (row + col) as f64;
        let variation = ((row * 7 + col * 13) % 100) as f64 / 10.0;
        base + variation
    });
    Raster::from_array(data, grid).unwrap().with_crs(CRS::from_epsg(32633))
}

/// Star-shaped polygon centered in the raster, reaching 40% of its width
fn create_star(size: usize) -> Geometry {
    let c = size as f64 / 2.0;
    let coords: Vec<(f64, f64)> = (0..=20)
        .map(|i| {
            let angle = i as f64 * std::f64::consts::PI / 10.0;
            let radius = (if i % 2 == 0 { 0.4 } else { 0.2 }) * size as f64;
            (c + radius * angle.cos(), c + radius * angle.sin())
        })
        .collect();
    Geometry::polygon(Polygon::new(LineString::from(coords), vec![]), CRS::from_epsg(32633))
}

fn bench_polygon_zonal(c: &mut Criterion) {
    let mut group = c.benchmark_group("polygon_zonal");

    for size in [256, 512, 1024].iter() {
        let raster = create_raster(*size);
        let star = create_star(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mask = cover_cells(black_box(&star), raster.grid(), raster.crs()).unwrap();
                reduce(&raster, &mask, Reduction::Mean).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_buffer_zonal(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_zonal");
    let raster = create_raster(1024);

    for count in [10, 100, 1000].iter() {
        let points = Geometry::multi_point(
            (0..*count).map(|i| (((i * 37) % 1000) as f64 + 12.0, ((i * 91) % 1000) as f64 + 12.0)),
            CRS::from_epsg(32633),
        );

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| reduce_with_buffer(&raster, black_box(&points), 10.0, Reduction::Sum).unwrap())
        });
    }

    group.finish();
}

fn bench_buffer_mask(c: &mut Criterion) {
    let raster = create_raster(1024);
    let point = Geometry::point(512.3, 498.7, CRS::from_epsg(32633));

    c.bench_function("cover_buffer_r50", |b| {
        b.iter(|| cover_buffer(black_box(&point), 50.0, raster.grid(), raster.crs()).unwrap())
    });
}

criterion_group!(benches, bench_polygon_zonal, bench_buffer_zonal, bench_buffer_mask);
criterion_main!(benches);
