//! Benchmarks for PSD estimation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use num_complex::Complex64;
use seismic_psd::response::{FrequencyGrid, ResponseCurve};
use seismic_psd::spectrum::{FftEngine, PsdEstimator};

fn trace(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| (i as f64 * 0.37).sin() * 1000.0 + ((i * 7919) % 211) as f64)
        .collect()
}

fn bench_fft(c: &mut Criterion) {
    let mut group = c.benchmark_group("fft_transform");

    for n in [1024usize, 8192, 65536] {
        let engine = FftEngine::new(n).unwrap();
        let data: Vec<f64> = (0..2 * n).map(|i| (i % 17) as f64).collect();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            let mut buffer = data.clone();
            b.iter(|| {
                engine.transform_packed(black_box(&mut buffer)).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("psd_estimate");
    group.sample_size(20);

    // One hour at 1, 20 and 40 Hz
    for interval_ms in [1000.0, 50.0, 25.0] {
        let n = (3_600_000.0 / interval_ms) as usize;
        let samples = trace(n);
        let grid = FrequencyGrid::new(interval_ms, n);
        let response = ResponseCurve::new(grid, vec![Complex64::new(1.0e9, 0.0); grid.pad_length]);
        let estimator = PsdEstimator::default();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &samples, |b, samples| {
            b.iter(|| estimator.estimate(black_box(samples), interval_ms, &response).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fft, bench_estimate);
criterion_main!(benches);
