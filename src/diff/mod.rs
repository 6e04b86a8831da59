//! Change detection between the current dataset and the previous snapshot.
//!
//! [`DiffEngine::diff`] keys both datasets by identity, classifies every
//! key as added, removed, changed, or unchanged, and records per-column
//! deltas for changed keys. Schema differences are reported as drift and
//! never fail the comparison.

pub mod engine;
pub mod format;

pub use engine::{DiffEngine, DEFAULT_NUMERIC_TOLERANCE};
pub use format::{format_diff_markdown, format_diff_terminal};

use crate::dataset::{ColumnType, RecordKey, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One column that differs for a shared key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDelta {
    pub column: String,
    pub old_value: Value,
    pub new_value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// Column exists only in the current dataset.
    AddedColumn,
    /// Column exists only in the previous snapshot.
    RemovedColumn,
    /// Column exists in both with different declared types; its values are
    /// not compared.
    TypeMismatch,
}

impl DriftKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddedColumn => "added_column",
            Self::RemovedColumn => "removed_column",
            Self::TypeMismatch => "type_mismatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDrift {
    pub column: String,
    pub kind: DriftKind,
    pub previous_type: Option<ColumnType>,
    pub current_type: Option<ColumnType>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub current_rows: usize,
    pub previous_rows: usize,
}

/// Keyed delta between two dataset versions.
///
/// Key sets and changed keys are ordered, so the same inputs always
/// serialize to the same report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    /// No previous snapshot existed.
    pub first_run: bool,
    /// Absolute tolerance used for numeric columns.
    pub tolerance: f64,
    /// Columns whose values were compared, sorted.
    pub compared_columns: Vec<String>,
    pub added: BTreeSet<RecordKey>,
    pub removed: BTreeSet<RecordKey>,
    pub changed: BTreeMap<RecordKey, Vec<ColumnDelta>>,
    pub schema_drift: Vec<SchemaDrift>,
    pub summary: DiffSummary,
}

impl DiffReport {
    /// True when nothing was added, removed, or changed and the schemas
    /// agree.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && self.schema_drift.is_empty()
    }

    /// Number of changed keys per column, most frequently changed first.
    pub fn changes_by_column(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for deltas in self.changed.values() {
            for delta in deltas {
                *counts.entry(delta.column.as_str()).or_default() += 1;
            }
        }
        let mut by_column: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(column, n)| (column.to_string(), n))
            .collect();
        by_column.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        by_column
    }
}
