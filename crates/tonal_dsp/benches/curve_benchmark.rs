//! Performance benchmarks for the EQ response curve
//!
//! Run with: cargo bench -p tonal_dsp

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tonal_dsp::{BiquadFilter, ComplexNumber, FrequencyResponseCurve};

fn benchmark_curve_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_curve");

    let layouts: [&[f64]; 2] = [
        &[60.0, 230.0, 910.0, 3600.0, 14000.0],
        &[31.0, 62.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0],
    ];

    for freqs in layouts {
        for points in [64, 256, 1024] {
            let curve = FrequencyResponseCurve::new(freqs.to_vec())
                .unwrap()
                .with_points(points);
            let levels: Vec<f32> = (0..freqs.len()).map(|i| (i as f32 - 2.0) * 1.5).collect();

            group.bench_function(format!("{}_bands_{}_points", freqs.len(), points), |b| {
                b.iter(|| curve.evaluate(black_box(&levels)).unwrap());
            });
        }
    }

    group.finish();
}

fn benchmark_transfer_single(c: &mut Criterion) {
    c.bench_function("high_shelf_evaluate_transfer", |b| {
        let filter = BiquadFilter::high_shelf(1000.0, 44100.0, 6.0, 1.0);
        let z = ComplexNumber::from_polar_unit(0.3);

        b.iter(|| black_box(filter.evaluate_transfer(black_box(z))));
    });
}

fn benchmark_shelf_configure(c: &mut Criterion) {
    c.bench_function("high_shelf_configure", |b| {
        let mut filter = BiquadFilter::default();
        let mut gain = 0.0_f64;

        b.iter(|| {
            // Simulate dragging a band
            filter.configure_high_shelf(1000.0, 44100.0, black_box(gain), 1.0);
            gain = (gain + 0.5) % 15.0;
        });
    });
}

criterion_group!(
    benches,
    benchmark_curve_evaluation,
    benchmark_transfer_single,
    benchmark_shelf_configure
);

criterion_main!(benches);
