//! Property-based tests for snapshot diffing
//!
//! These tests verify invariants that should hold for any pair of datasets:
//! - Added, changed and unchanged partition the current keys
//! - Removed keys are exactly the previous keys missing now
//! - Parallel and sequential comparison agree
//! - A first run reports every key as added

mod common;

use common::{dataset, property};
use propflow::dataset::{Record, RecordKey};
use propflow::diff::DiffEngine;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Keys with a market value, deduplicated by key.
fn side_strategy() -> impl Strategy<Value = BTreeMap<u8, u8>> {
    prop::collection::btree_map(0u8..40, 0u8..4, 0..30)
}

fn to_records(side: &BTreeMap<u8, u8>) -> Vec<Record> {
    side.iter()
        .map(|(id, v)| property(&id.to_string(), f64::from(*v) * 10.0))
        .collect()
}

fn key_set(side: &BTreeMap<u8, u8>) -> BTreeSet<RecordKey> {
    side.keys().map(|id| RecordKey::new(id.to_string())).collect()
}

proptest! {
    /// Property: the report classifies every key exactly once
    #[test]
    fn prop_diff_partitions_keys(current in side_strategy(), previous in side_strategy()) {
        let report = DiffEngine::default()
            .diff(&dataset(to_records(&current)), Some(&dataset(to_records(&previous))));

        let kc = key_set(&current);
        let kp = key_set(&previous);
        let changed: BTreeSet<RecordKey> = report.changed.keys().cloned().collect();
        let shared: BTreeSet<RecordKey> = kc.intersection(&kp).cloned().collect();

        prop_assert!(!report.first_run);
        prop_assert_eq!(&report.added, &kc.difference(&kp).cloned().collect::<BTreeSet<_>>());
        prop_assert_eq!(&report.removed, &kp.difference(&kc).cloned().collect::<BTreeSet<_>>());
        prop_assert!(changed.is_subset(&shared));
        prop_assert_eq!(
            report.summary.added + report.summary.changed + report.summary.unchanged,
            kc.len()
        );

        for key in &shared {
            let id: u8 = key.as_str().parse().unwrap();
            let differs = current[&id] != previous[&id];
            prop_assert_eq!(changed.contains(key), differs);
        }
    }

    /// Property: parallel comparison produces the same report
    #[test]
    fn prop_parallel_matches_sequential(current in side_strategy(), previous in side_strategy()) {
        let cur = dataset(to_records(&current));
        let prev = dataset(to_records(&previous));

        let parallel = DiffEngine::default().with_parallel(true).diff(&cur, Some(&prev));
        let sequential = DiffEngine::default().with_parallel(false).diff(&cur, Some(&prev));

        prop_assert_eq!(parallel.added, sequential.added);
        prop_assert_eq!(parallel.removed, sequential.removed);
        prop_assert_eq!(parallel.changed, sequential.changed);
    }

    /// Property: without a snapshot everything is added and nothing else
    #[test]
    fn prop_first_run_adds_everything(current in side_strategy()) {
        let report = DiffEngine::default().diff(&dataset(to_records(&current)), None);

        prop_assert!(report.first_run);
        prop_assert_eq!(report.added, key_set(&current));
        prop_assert!(report.removed.is_empty());
        prop_assert!(report.changed.is_empty());
    }
}

#[test]
fn test_changes_within_tolerance_are_ignored() {
    let previous = dataset(vec![property("1", 100.0)]);
    let current = dataset(vec![property("1", 100.0 + 1e-9)]);

    let report = DiffEngine::default().diff(&current, Some(&previous));

    assert!(report.changed.is_empty());
    assert_eq!(report.summary.unchanged, 1);
}

#[test]
fn test_changed_value_reports_old_and_new() {
    let previous = dataset(vec![property("1", 10.0)]);
    let current = dataset(vec![property("1", 15.0)]);

    let report = DiffEngine::default().diff(&current, Some(&previous));

    let deltas = &report.changed[&RecordKey::new("1")];
    assert_eq!(deltas.len(), 1);
    assert_eq!(deltas[0].column, "market_value");
    assert_eq!(deltas[0].old_value.as_f64(), Some(10.0));
    assert_eq!(deltas[0].new_value.as_f64(), Some(15.0));
}
