use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use propflow::dataset::{record, Dataset, Record, Value};
use propflow::diff::DiffEngine;
use propflow::pipeline::{FinalizationConfig, Finalizer};
use std::hint::black_box;

fn property(id: usize, market_value: f64) -> Record {
    record([
        ("opa_id", Value::from(format!("{:09}", id))),
        ("market_value", Value::from(market_value)),
        ("owner_1", Value::from(format!("OWNER {}", id % 997))),
        ("zip_code", Value::from(format!("191{:02}", id % 50))),
        ("vacant", Value::from(id % 7 == 0)),
    ])
}

/// Two snapshots of `rows` properties with 5% churn at each end and every
/// tenth shared row revalued.
fn snapshots(rows: usize) -> (Dataset, Dataset) {
    let churn = rows / 20;
    let previous: Vec<Record> = (0..rows).map(|i| property(i, i as f64 * 100.0)).collect();
    let current: Vec<Record> = (churn..rows + churn)
        .map(|i| {
            let value = if i % 10 == 0 { i as f64 * 110.0 } else { i as f64 * 100.0 };
            property(i, value)
        })
        .collect();

    let build = |records| {
        let mut ds = Dataset::new("opa_id").with_records(records);
        ds.infer_schema();
        ds
    };
    (build(current), build(previous))
}

fn benchmark_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_engine");
    for rows in [1_000, 10_000, 100_000] {
        let (current, previous) = snapshots(rows);

        group.bench_with_input(BenchmarkId::new("sequential", rows), &rows, |b, _| {
            let engine = DiffEngine::default().with_parallel(false);
            b.iter(|| black_box(engine.diff(black_box(&current), Some(&previous))))
        });
        group.bench_with_input(BenchmarkId::new("parallel", rows), &rows, |b, _| {
            let engine = DiffEngine::default().with_parallel(true);
            b.iter(|| black_box(engine.diff(black_box(&current), Some(&previous))))
        });
    }
    group.finish();
}

fn benchmark_finalize(c: &mut Criterion) {
    let (current, _) = snapshots(10_000);
    let mut with_duplicates = current.clone();
    with_duplicates
        .records
        .extend(current.records.iter().step_by(3).cloned());

    let finalizer = Finalizer::new(FinalizationConfig {
        numeric_columns: vec!["market_value".to_string()],
        text_columns: vec!["zip_code".to_string()],
    });
    c.bench_function("finalize_10k_with_duplicates", |b| {
        b.iter(|| black_box(finalizer.finalize(with_duplicates.clone()).unwrap()))
    });
}

criterion_group!(benches, benchmark_diff, benchmark_finalize);
criterion_main!(benches);
