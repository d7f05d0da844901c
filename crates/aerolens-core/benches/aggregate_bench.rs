//! Benchmarks for the aggregation engine.
//!
//! Run with: cargo bench -p aerolens-core --bench aggregate_bench
//!
//! The incident dataset is a few thousand rows; these sizes bracket it and
//! check that a full recompute stays well inside one interactive frame.

use aerolens_core::{
    FilterState, IncidentRecord, Manufacturer, Phase, PhaseFilter, Severity, aggregate,
    aggregate_parallel,
};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// Deterministic synthetic records spread over the dataset years.
fn synthetic_records(n: usize) -> Vec<IncidentRecord> {
    let mut state = 0x9e37_79b9_7f4a_7c15u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    (0..n)
        .map(|_| {
            let year = 1995 + (next() % 22) as i32;
            let make = (next() % 6) as usize;
            let phase = Phase::RECOGNIZED[(next() % 11) as usize];
            let severity = Severity::ALL[(next() % 4) as usize];
            IncidentRecord::new(year, Manufacturer::ALL.get(make).copied(), phase, severity)
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    for n in [1_000usize, 10_000, 100_000] {
        let records = synthetic_records(n);
        group.throughput(Throughput::Elements(n as u64));

        let all = FilterState::default();
        group.bench_with_input(BenchmarkId::new("all_selected", n), &records, |b, records| {
            b.iter(|| black_box(aggregate(black_box(records), black_box(&all))))
        });

        let narrow = FilterState::default()
            .with_year_range(2005, 2010)
            .with_phase(PhaseFilter::Only(Phase::Landing))
            .unwrap_or_default();
        group.bench_with_input(BenchmarkId::new("narrow", n), &records, |b, records| {
            b.iter(|| black_box(aggregate(black_box(records), black_box(&narrow))))
        });

        group.bench_with_input(BenchmarkId::new("parallel", n), &records, |b, records| {
            b.iter(|| black_box(aggregate_parallel(black_box(records), black_box(&all))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
