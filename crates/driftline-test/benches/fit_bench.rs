//! Benchmarks for driftline correlation

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use driftline_correlate::{CorrelationEngine, LinearFit};
use driftline_journal::parse_series;
use driftline_test::{ClockModel, DelayModel, SyncSimulator};

fn simulator() -> SyncSimulator {
    let mut sim = SyncSimulator::new(7, 0.04, DelayModel::lan());
    sim.add_node(ClockModel::new("A", 20.0, 0.5))
        .add_node(ClockModel::new("B", -5.0, 1.5));
    sim
}

fn bench_linear_fit(c: &mut Criterion) {
    let series = simulator().series(10_000);
    let samples = &series["A"].samples;

    c.bench_function("linear_fit_10k", |b| {
        b.iter(|| {
            let fit = LinearFit::fit(black_box(samples));
            black_box(fit)
        })
    });
}

fn bench_analyze_series(c: &mut Criterion) {
    let series = simulator().series(10_000);
    let engine = CorrelationEngine::new();

    c.bench_function("analyze_series_2x10k", |b| {
        b.iter(|| black_box(engine.analyze_series(black_box(&series))))
    });
}

fn bench_parse_log(c: &mut Criterion) {
    let mut text = String::from("pico_time_s,node,esp_time_s,dist_cm\n");
    for r in simulator().records(5_000, 17.25) {
        text.push_str(&r.to_row());
    }

    c.bench_function("parse_log_10k_rows", |b| {
        b.iter(|| {
            let parsed = parse_series(black_box(text.as_bytes())).unwrap();
            black_box(parsed)
        })
    });
}

criterion_group!(benches, bench_linear_fit, bench_analyze_series, bench_parse_log);
criterion_main!(benches);
