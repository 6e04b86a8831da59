//! Column-level profile of a dataset, sent to reporters after finalization.

use crate::dataset::{ColumnType, Dataset, Value};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Distinct counts stop at this many values.
const DISTINCT_CAP: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub column_type: Option<ColumnType>,
    pub non_null: usize,
    pub nulls: usize,
    /// Distinct non-null values for text and boolean columns, capped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
}

impl ColumnProfile {
    pub fn null_fraction(&self) -> f64 {
        let total = self.non_null + self.nulls;
        if total == 0 {
            0.0
        } else {
            self.nulls as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    /// Name the profile is reported under (usually the sink name).
    pub name: String,
    pub rows: usize,
    pub identity_key: String,
    pub columns: Vec<ColumnProfile>,
}

impl DatasetProfile {
    /// Profile every column that is declared or appears in any record.
    pub fn from_dataset(name: impl Into<String>, dataset: &Dataset) -> Self {
        let mut names: BTreeSet<&str> = dataset.schema.columns().collect();
        for record in &dataset.records {
            names.extend(record.keys().map(String::as_str));
        }

        let columns = names
            .into_par_iter()
            .map(|column| profile_column(dataset, column))
            .collect();

        Self {
            name: name.into(),
            rows: dataset.len(),
            identity_key: dataset.identity_key.clone(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn profile_column(dataset: &Dataset, column: &str) -> ColumnProfile {
    let column_type = dataset.schema.get(column);
    let values = dataset.records.iter().map(|r| r.get(column).unwrap_or(&Value::Null));

    let mut non_null = 0;
    let mut nulls = 0;
    let mut sum = 0.0;
    let mut numeric = 0usize;
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    let mut distinct: HashSet<String> = HashSet::new();

    for value in values {
        if value.is_null() {
            nulls += 1;
            continue;
        }
        non_null += 1;
        match column_type {
            Some(ColumnType::Numeric) => {
                if let Some(n) = value.as_f64() {
                    numeric += 1;
                    sum += n;
                    min = Some(min.map_or(n, |m| m.min(n)));
                    max = Some(max.map_or(n, |m| m.max(n)));
                }
            }
            Some(ColumnType::Text) | Some(ColumnType::Boolean) => {
                if distinct.len() < DISTINCT_CAP {
                    distinct.insert(value.to_string());
                }
            }
            _ => {}
        }
    }

    let tracks_distinct = matches!(column_type, Some(ColumnType::Text | ColumnType::Boolean));
    ColumnProfile {
        name: column.to_string(),
        column_type,
        non_null,
        nulls,
        distinct: tracks_distinct.then_some(distinct.len()),
        min,
        max,
        mean: (numeric > 0).then(|| sum / numeric as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::record;

    #[test]
    fn test_numeric_and_text_statistics() {
        let mut ds = Dataset::new("opa_id").with_records(vec![
            record([
                ("opa_id", Value::from("1")),
                ("market_value", Value::from(100.0)),
                ("zoning", Value::from("RM1")),
            ]),
            record([
                ("opa_id", Value::from("2")),
                ("market_value", Value::from(300.0)),
                ("zoning", Value::from("RM1")),
            ]),
            record([("opa_id", Value::from("3")), ("market_value", Value::Null)]),
        ]);
        ds.infer_schema();

        let profile = DatasetProfile::from_dataset("all_properties_end", &ds);
        assert_eq!(profile.rows, 3);

        let market = profile.column("market_value").unwrap();
        assert_eq!(market.non_null, 2);
        assert_eq!(market.nulls, 1);
        assert_eq!(market.min, Some(100.0));
        assert_eq!(market.max, Some(300.0));
        assert_eq!(market.mean, Some(200.0));
        assert_eq!(market.distinct, None);

        let zoning = profile.column("zoning").unwrap();
        assert_eq!(zoning.nulls, 1);
        assert_eq!(zoning.distinct, Some(1));
        assert!((zoning.null_fraction() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_columns_are_sorted() {
        let ds = Dataset::new("opa_id").with_records(vec![record([
            ("b", Value::Null),
            ("a", Value::Null),
        ])]);
        let names: Vec<String> = DatasetProfile::from_dataset("x", &ds)
            .columns
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
