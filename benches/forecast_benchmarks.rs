use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use demand_forecast_api::ml::forecasting::{
    economic_order_quantity, exponential_smoothing, total_cost,
};
use demand_forecast_api::models::series::{normalize_series, RawValue};

fn history(len: usize) -> Vec<f64> {
    (0..len).map(|m| 100.0 + (m % 12) as f64 * 7.5).collect()
}

// Smoothing cost grows linearly with the length of the history
fn smoothing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("exponential_smoothing");

    for size in [12, 120, 1_200, 12_000].iter() {
        let demand = history(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &demand, |b, demand| {
            b.iter(|| exponential_smoothing(black_box(demand), black_box(0.3)))
        });
    }

    group.finish();
}

fn eoq_and_cost_benchmark(c: &mut Criterion) {
    c.bench_function("eoq_and_total_cost", |b| {
        b.iter(|| {
            let demand = black_box(18.1);
            let eoq = economic_order_quantity(demand, black_box(0.2), black_box(44.5));
            total_cost(black_box(10_000.0), 0.2, 44.5, demand, eoq)
        });
    });
}

// Cached payloads are decoded and normalised on every hit
fn cached_payload_benchmark(c: &mut Criterion) {
    let values: Vec<RawValue> = history(120).into_iter().map(RawValue::Float).collect();
    let payload = serde_json::to_string(&values).unwrap();

    c.bench_function("decode_and_normalise_cached_series", |b| {
        b.iter(|| {
            let decoded: Vec<RawValue> = serde_json::from_str(black_box(&payload)).unwrap();
            normalize_series(&decoded).unwrap()
        });
    });
}

criterion_group!(
    benches,
    smoothing_benchmark,
    eoq_and_cost_benchmark,
    cached_payload_benchmark
);
criterion_main!(benches);
