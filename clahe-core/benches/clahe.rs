//! Benchmarks for the CLAHE stages
//!
//! Run with: cargo bench -p clahe-core

use clahe_core::{build_tile_luts, clahe, ClaheParams, GridSize, Plane};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Smooth gradient with a little texture, so tiles have varied histograms.
fn generate_plane(width: u32, height: u32) -> Plane<u8> {
    let data = (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            let base = (x * 160 / width + y * 60 / height) as u8;
            base.wrapping_add(((x ^ y) & 15) as u8)
        })
        .collect();
    Plane::new(width, height, data).unwrap()
}

fn bench_clahe(c: &mut Criterion) {
    let mut group = c.benchmark_group("clahe");
    let params = ClaheParams::standard();

    for size in [256u32, 512, 1024] {
        let plane = generate_plane(size, size);
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(
            BenchmarkId::new("tile_luts", format!("{}x{}", size, size)),
            &plane,
            |b, plane| b.iter(|| build_tile_luts(black_box(plane), black_box(&params)).unwrap()),
        );
        group.bench_with_input(
            BenchmarkId::new("full", format!("{}x{}", size, size)),
            &plane,
            |b, plane| b.iter(|| clahe(black_box(plane), black_box(&params)).unwrap()),
        );
    }

    group.finish();
}

fn bench_grid_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_size");
    let plane = generate_plane(512, 512);

    for tiles in [2u32, 8, 32] {
        let params = ClaheParams::standard().with_grid(GridSize::square(tiles));
        group.bench_with_input(BenchmarkId::from_parameter(tiles), &params, |b, params| {
            b.iter(|| clahe(black_box(&plane), black_box(params)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_clahe, bench_grid_sizes);
criterion_main!(benches);
