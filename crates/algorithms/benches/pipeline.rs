//! Benchmarks for per-cell stages and the zonal reduction

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use landheat_algorithms::prelude::*;

fn create_band(size: usize, base: f64) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64 * 30.0, 30.0, -30.0));
    for row in 0..size {
        for col in 0..size {
            let v = base + ((row * 7 + col * 13) % 200) as f64 * 0.001;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn whole_grid(size: usize) -> StudyRegion {
    let extent = size as f64 * 30.0;
    StudyRegion::from_bounds(0.0, 0.0, extent, extent, CRS::default()).unwrap()
}

fn bench_ndvi(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/ndvi");
    let tiles = TiledProcessor::default();
    for size in [256, 512, 1024, 2048] {
        let nir = create_band(size, 0.3);
        let red = create_band(size, 0.1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ndvi(black_box(&nir), black_box(&red), &tiles).unwrap())
        });
    }
    group.finish();
}

fn bench_lst(c: &mut Criterion) {
    let mut group = c.benchmark_group("thermal/lst");
    let tiles = TiledProcessor::default();
    for size in [256, 512, 1024, 2048] {
        let tb = create_band(size, 295.0);
        let emissivity = create_band(size, 0.9);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                land_surface_temperature(black_box(&tb), black_box(&emissivity), &tiles).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_zonal(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics/zonal_summary");
    let tiles = TiledProcessor::default();
    let params = ZonalParams::default();
    for size in [256, 512, 1024] {
        let field = create_band(size, 30.0);
        let region = whole_grid(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| zonal_summary(black_box(&field), &region, &params, &tiles).unwrap())
        });
    }
    group.finish();
}

fn bench_median_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite/median");
    let tiles = TiledProcessor::default();
    for scenes in [3, 9, 23] {
        let series = SceneSeries::new(
            (0..scenes)
                .map(|i| {
                    Scene::new(
                        SceneMetadata {
                            id: format!("scene_{}", i),
                            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                                + chrono::Duration::days(16 * i as i64),
                            cloud_cover: 0.0,
                        },
                        BandStack::from_bands([
                            (Band::RED, create_band(512, 0.1 + i as f64 * 0.01)),
                            (Band::NIR, create_band(512, 0.3)),
                        ])
                        .unwrap(),
                    )
                })
                .collect(),
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(scenes), &scenes, |b, _| {
            b.iter(|| median_composite(black_box(&series), None, &tiles).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ndvi, bench_lst, bench_zonal, bench_median_composite);
criterion_main!(benches);
