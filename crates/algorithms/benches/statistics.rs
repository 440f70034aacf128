//! Benchmarks for gap filling and temporal reduction

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use terramex_algorithms::statistics::{fill_gaps, reduce_collection, GapFillParams, Reducer};
use terramex_core::Raster;

fn slice(size: usize, day: usize) -> Raster<f64> {
    let data = (0..size * size)
        .map(|i| {
            if (i + day) % 17 == 0 {
                f64::NAN
            } else {
                ((i * 31 + day * 7) % 97) as f64
            }
        })
        .collect();
    Raster::from_vec(data, size, size).unwrap()
}

fn bench_gap_fill(c: &mut Criterion) {
    let raster = slice(512, 0);
    c.bench_function("fill_gaps_512", |b| {
        b.iter(|| fill_gaps(black_box(&raster), GapFillParams::default()).unwrap())
    });
}

fn bench_reduce(c: &mut Criterion) {
    let series: Vec<_> = (0..150).map(|d| slice(256, d)).collect();
    let mut group = c.benchmark_group("reduce_150x256");
    for reducer in [Reducer::Mean, Reducer::StdDev] {
        group.bench_function(reducer.suffix(), |b| {
            b.iter(|| reduce_collection(black_box(&series), reducer).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_gap_fill, bench_reduce);
criterion_main!(benches);
