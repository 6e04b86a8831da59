use super::{ColumnDelta, DiffReport, DiffSummary, DriftKind, SchemaDrift};
use crate::dataset::{ColumnType, Dataset, Record, RecordKey, Value};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Numbers closer than this are considered equal.
pub const DEFAULT_NUMERIC_TOLERANCE: f64 = 1e-6;

static NULL: Value = Value::Null;

/// Compares a dataset against the previous snapshot.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    tolerance: f64,
    parallel: bool,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_NUMERIC_TOLERANCE,
            parallel: true,
        }
    }
}

impl DiffEngine {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.abs(),
            ..Self::default()
        }
    }

    /// Scan shared keys with rayon. Output is identical either way.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn diff(&self, current: &Dataset, previous: Option<&Dataset>) -> DiffReport {
        let current_index = current.index_by_key();

        let Some(previous) = previous else {
            log::info!("No previous snapshot; all {} keys are new", current_index.len());
            let added: BTreeSet<RecordKey> = current_index.into_keys().collect();
            return DiffReport {
                first_run: true,
                tolerance: self.tolerance,
                compared_columns: Vec::new(),
                summary: DiffSummary {
                    added: added.len(),
                    current_rows: current.len(),
                    ..DiffSummary::default()
                },
                added,
                removed: BTreeSet::new(),
                changed: BTreeMap::new(),
                schema_drift: Vec::new(),
            };
        };

        let previous_index = previous.index_by_key();
        let (columns, schema_drift) = compare_schemas(current, previous);

        let added: BTreeSet<RecordKey> = current_index
            .keys()
            .filter(|k| !previous_index.contains_key(*k))
            .cloned()
            .collect();
        let removed: BTreeSet<RecordKey> = previous_index
            .keys()
            .filter(|k| !current_index.contains_key(*k))
            .cloned()
            .collect();

        let mut shared: Vec<&RecordKey> = current_index
            .keys()
            .filter(|k| previous_index.contains_key(*k))
            .collect();
        shared.sort();

        let compare = |key: &&RecordKey| -> Option<(RecordKey, Vec<ColumnDelta>)> {
            let cur = current_index.get(*key)?;
            let prev = previous_index.get(*key)?;
            let deltas = self.compare_records(cur, prev, &columns);
            (!deltas.is_empty()).then(|| ((*key).clone(), deltas))
        };
        let changed: BTreeMap<RecordKey, Vec<ColumnDelta>> = if self.parallel {
            shared.par_iter().filter_map(compare).collect::<Vec<_>>().into_iter().collect()
        } else {
            shared.iter().filter_map(compare).collect()
        };

        let summary = DiffSummary {
            added: added.len(),
            removed: removed.len(),
            changed: changed.len(),
            unchanged: shared.len() - changed.len(),
            current_rows: current.len(),
            previous_rows: previous.len(),
        };
        log::info!(
            "Diff: {} added, {} removed, {} changed, {} unchanged",
            summary.added,
            summary.removed,
            summary.changed,
            summary.unchanged
        );
        if !schema_drift.is_empty() {
            log::warn!("Schema drift in {} column(s)", schema_drift.len());
        }

        DiffReport {
            first_run: false,
            tolerance: self.tolerance,
            compared_columns: columns.into_iter().map(|(name, _)| name).collect(),
            added,
            removed,
            changed,
            schema_drift,
            summary,
        }
    }

    fn compare_records(
        &self,
        current: &Record,
        previous: &Record,
        columns: &[(String, ColumnType)],
    ) -> Vec<ColumnDelta> {
        columns
            .iter()
            .filter_map(|(column, column_type)| {
                let new_value = current.get(column).unwrap_or(&NULL);
                let old_value = previous.get(column).unwrap_or(&NULL);
                (!self.values_equal(*column_type, old_value, new_value)).then(|| ColumnDelta {
                    column: column.clone(),
                    old_value: old_value.clone(),
                    new_value: new_value.clone(),
                })
            })
            .collect()
    }

    fn values_equal(&self, column_type: ColumnType, old: &Value, new: &Value) -> bool {
        match (old, new) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            _ => match column_type {
                ColumnType::Numeric => match (old.as_f64(), new.as_f64()) {
                    (Some(a), Some(b)) => (a - b).abs() <= self.tolerance,
                    _ => old == new,
                },
                ColumnType::Geometry => match (old.as_geometry(), new.as_geometry()) {
                    (Some(a), Some(b)) => a.same_vertices(b),
                    _ => old == new,
                },
                ColumnType::Text | ColumnType::Boolean => old == new,
            },
        }
    }
}

/// Columns to compare (declared in both schemas with one type, identity
/// columns excluded) and the drift between the two schemas.
fn compare_schemas(
    current: &Dataset,
    previous: &Dataset,
) -> (Vec<(String, ColumnType)>, Vec<SchemaDrift>) {
    let is_identity =
        |column: &str| column == current.identity_key || column == previous.identity_key;
    let mut columns = Vec::new();
    let mut drift = Vec::new();

    for (column, current_type) in current.schema.iter() {
        match previous.schema.get(column) {
            Some(previous_type) if previous_type == current_type => {
                if !is_identity(column) {
                    columns.push((column.to_string(), current_type));
                }
            }
            Some(previous_type) => drift.push(SchemaDrift {
                column: column.to_string(),
                kind: DriftKind::TypeMismatch,
                previous_type: Some(previous_type),
                current_type: Some(current_type),
            }),
            None => drift.push(SchemaDrift {
                column: column.to_string(),
                kind: DriftKind::AddedColumn,
                previous_type: None,
                current_type: Some(current_type),
            }),
        }
    }
    for (column, previous_type) in previous.schema.iter() {
        if !current.schema.contains(column) {
            drift.push(SchemaDrift {
                column: column.to_string(),
                kind: DriftKind::RemovedColumn,
                previous_type: Some(previous_type),
                current_type: None,
            });
        }
    }
    drift.sort_by(|a, b| a.column.cmp(&b.column).then(a.kind.cmp(&b.kind)));

    (columns, drift)
}
