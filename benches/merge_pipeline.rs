use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fleetwatch::{merge, MetricSeries, SeriesBundle, Snapshot, Staleness};
use serde_json::json;

const NOW: i64 = 1_700_000_000;

fn fleet(count: usize) -> (Vec<Snapshot>, SeriesBundle) {
    let mut snapshots = Vec::with_capacity(count);
    let mut bundle = SeriesBundle::new();

    for i in 0..count {
        let id = format!("server-{:04}", count - i);
        let payload = json!({
            "name": id,
            "cpu": (i % 100) as u64,
            "memory_used": 4096,
            "memory_total": 16384,
            "storage": [
                {"directory": "/", "total": 500_000, "used": 120_000},
                {"directory": "/data", "total": 2_000_000, "used": 1_500_000}
            ]
        });
        // Every tenth server has gone quiet.
        let age = if i % 10 == 0 { 600 } else { (i % 45) as i64 };
        snapshots.push(Snapshot::new(id.clone(), payload, NOW - age));

        let points = (0..60).map(|m| (NOW - 3_600 + m * 60, Some((m % 100) as f64)));
        bundle.insert(id.clone(), "cpu", MetricSeries::from_points(points.clone()));
        bundle.insert(id, "memory", MetricSeries::from_points(points));
    }

    (snapshots, bundle)
}

/// Benchmark merge() with varying fleet sizes
fn bench_merge_varying_fleet(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_fleet_size");
    let staleness = Staleness::after(Duration::from_secs(60));

    for count in [10, 100, 1_000].iter() {
        let (snapshots, bundle) = fleet(*count);

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| black_box(merge(&snapshots, &bundle, staleness, NOW)));
        });
    }
    group.finish();
}

/// Benchmark merge() when payloads arrive as encoded JSON strings
fn bench_merge_string_payloads(c: &mut Criterion) {
    let (snapshots, bundle) = fleet(100);
    let encoded: Vec<Snapshot> = snapshots
        .into_iter()
        .map(|s| Snapshot::new(s.entity_id, json!(s.payload.to_string()), s.timestamp))
        .collect();

    c.bench_function("merge_string_payloads", |b| {
        b.iter(|| black_box(merge(&encoded, &bundle, Staleness::disabled(), NOW)));
    });
}

criterion_group!(benches, bench_merge_varying_fleet, bench_merge_string_payloads);
criterion_main!(benches);
