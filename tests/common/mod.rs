//! Shared fixtures for integration tests.
#![allow(dead_code)]

use propflow::dataset::{record, Dataset, Record, Value};
use std::path::Path;

/// A property row keyed by `opa_id` with one numeric column.
pub fn property(id: &str, market_value: f64) -> Record {
    record([
        ("opa_id", Value::from(id)),
        ("market_value", Value::from(market_value)),
    ])
}

/// Dataset keyed by `opa_id` with an inferred schema.
pub fn dataset(records: Vec<Record>) -> Dataset {
    let mut ds = Dataset::new("opa_id").with_records(records);
    ds.infer_schema();
    ds
}

pub fn write_dataset(path: &Path, records: Vec<Record>) {
    dataset(records).to_json_file(path).unwrap();
}

/// Identity keys of a dataset, in record order.
pub fn keys(ds: &Dataset) -> Vec<String> {
    ds.records
        .iter()
        .filter_map(|r| ds.key_of(r))
        .map(|k| k.as_str().to_string())
        .collect()
}
