//! Post-stage finalization.
//!
//! Runs once after the last stage: drop duplicate identity keys (first
//! occurrence wins), coerce the configured numeric columns, force the
//! configured categorical columns to text, then declare any column a stage
//! wrote without adding it to the schema.

use crate::dataset::{ColumnType, Dataset, RecordKey, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Stage name recorded on metadata entries written by finalization.
pub const FINALIZE_STAGE: &str = "finalize";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FinalizationError {
    #[error("identity column '{0}' is missing from the dataset")]
    MissingIdentityKey(String),

    #[error("{kind} coercion column '{column}' is missing from the dataset")]
    MissingColumn { column: String, kind: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizationConfig {
    /// Columns coerced to numbers; unparseable values become null.
    pub numeric_columns: Vec<String>,
    /// Categorical columns forced to text.
    pub text_columns: Vec<String>,
}

impl Default for FinalizationConfig {
    fn default() -> Self {
        Self {
            numeric_columns: [
                "market_value",
                "sale_price",
                "total_assessment",
                "total_due",
                "num_years_owed",
                "permit_count",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            text_columns: vec!["most_recent_year_owed".to_string()],
        }
    }
}

impl FinalizationConfig {
    /// No coercion at all; only deduplication.
    pub fn dedup_only() -> Self {
        Self {
            numeric_columns: Vec::new(),
            text_columns: Vec::new(),
        }
    }
}

/// What finalization changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinalizationReport {
    pub duplicates_dropped: usize,
    pub null_keys_dropped: usize,
    /// Non-null values that numeric coercion turned into null.
    pub values_nulled: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Finalizer {
    config: FinalizationConfig,
}

impl Finalizer {
    pub fn new(config: FinalizationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FinalizationConfig {
        &self.config
    }

    pub fn finalize(
        &self,
        mut dataset: Dataset,
    ) -> Result<(Dataset, FinalizationReport), FinalizationError> {
        self.check_columns(&dataset)?;

        let mut report = FinalizationReport::default();
        let (duplicates, null_keys) = dedup_by_key(&mut dataset);
        report.duplicates_dropped = duplicates;
        report.null_keys_dropped = null_keys;

        dataset.collect_metadata(FINALIZE_STAGE, "dropped_count", duplicates);
        if null_keys > 0 {
            dataset.collect_metadata(FINALIZE_STAGE, "null_key_dropped_count", null_keys);
        }
        log::info!("Duplicate rows dropped: {}", duplicates);
        if null_keys > 0 {
            log::warn!(
                "Dropped {} rows with no '{}' value",
                null_keys,
                dataset.identity_key
            );
        }

        for column in &self.config.numeric_columns {
            report.values_nulled += coerce_column(&mut dataset, column, ColumnType::Numeric);
        }
        for column in &self.config.text_columns {
            coerce_column(&mut dataset, column, ColumnType::Text);
        }
        if report.values_nulled > 0 {
            log::debug!(
                "Numeric coercion nulled {} unparseable values",
                report.values_nulled
            );
        }

        // Stages may write columns without declaring them; the diff and the
        // designated subset only see declared columns.
        let declared = dataset.schema.len();
        dataset.infer_schema();
        if dataset.schema.len() > declared {
            log::debug!(
                "Declared {} columns written by stages",
                dataset.schema.len() - declared
            );
        }

        Ok((dataset, report))
    }

    fn check_columns(&self, dataset: &Dataset) -> Result<(), FinalizationError> {
        if !has_column(dataset, &dataset.identity_key) {
            return Err(FinalizationError::MissingIdentityKey(
                dataset.identity_key.clone(),
            ));
        }
        let configured = self
            .config
            .numeric_columns
            .iter()
            .map(|c| (c, "numeric"))
            .chain(self.config.text_columns.iter().map(|c| (c, "text")));
        for (column, kind) in configured {
            if !has_column(dataset, column) {
                return Err(FinalizationError::MissingColumn {
                    column: column.clone(),
                    kind,
                });
            }
        }
        Ok(())
    }
}

/// A column exists when declared or carried by at least one record.
fn has_column(dataset: &Dataset, column: &str) -> bool {
    dataset.schema.contains(column) || dataset.records.iter().any(|r| r.contains_key(column))
}

/// Keep the first record per identity key. Returns `(duplicates, null_keys)`
/// dropped.
pub fn dedup_by_key(dataset: &mut Dataset) -> (usize, usize) {
    let key_column = dataset.identity_key.clone();
    let mut seen: HashSet<RecordKey> = HashSet::with_capacity(dataset.records.len());
    let mut duplicates = 0;
    let mut null_keys = 0;

    dataset.records.retain(|record| {
        match record.get(&key_column).and_then(RecordKey::from_value) {
            Some(key) => {
                let first = seen.insert(key);
                if !first {
                    duplicates += 1;
                }
                first
            }
            None => {
                null_keys += 1;
                false
            }
        }
    });

    (duplicates, null_keys)
}

/// Coerce every record's value in `column` and declare the column's type.
/// Records missing the column get an explicit null. Returns how many non-null
/// values became null.
fn coerce_column(dataset: &mut Dataset, column: &str, target: ColumnType) -> usize {
    let mut nulled = 0;
    for record in &mut dataset.records {
        let slot = record.entry(column.to_string()).or_default();
        let coerced = match target {
            ColumnType::Numeric => slot.to_numeric(),
            _ => slot.to_text(),
        };
        if !slot.is_null() && coerced.is_null() {
            nulled += 1;
        }
        *slot = coerced;
    }
    dataset.schema.insert(column, target);
    nulled
}
