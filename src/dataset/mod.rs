//! The dataset threaded through the pipeline.
//!
//! A [`Dataset`] is a plain data container: ordered records, a declared
//! schema, the name of the identity-key column, and the metadata entries
//! appended by stages. Stages own it while they run and hand it back.

pub mod geometry;
pub mod key;
pub mod metadata;
pub mod source;
pub mod schema;
pub mod value;

pub use geometry::{Coord, Geometry};
pub use key::RecordKey;
pub use metadata::{export_metadata_csv, write_metadata_csv, MetadataEntry};
pub use schema::{ColumnType, Schema};
pub use source::{CsvFileSource, DatasetSource, JsonFileSource};
pub use value::Value;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A single row: column name to value. Missing columns read as null.
pub type Record = BTreeMap<String, Value>;

/// Errors reading, writing, or reshaping datasets.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON dataset in {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid delimited dataset in {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to serialize dataset")]
    Serialize(#[from] serde_json::Error),

    #[error("column '{0}' not found")]
    MissingColumn(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Name of the column whose value identifies a record across runs.
    pub identity_key: String,

    #[serde(default)]
    pub schema: Schema,

    #[serde(default)]
    pub records: Vec<Record>,

    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

impl Dataset {
    pub fn new(identity_key: impl Into<String>) -> Self {
        Self {
            identity_key: identity_key.into(),
            schema: Schema::new(),
            records: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Append a metadata entry on behalf of a stage.
    pub fn collect_metadata(
        &mut self,
        stage_name: &str,
        description: impl Into<String>,
        value: impl ToString,
    ) {
        self.metadata
            .push(MetadataEntry::new(stage_name, description, value));
    }

    /// Identity key of a record, if it carries a usable one.
    pub fn key_of(&self, record: &Record) -> Option<RecordKey> {
        record
            .get(&self.identity_key)
            .and_then(RecordKey::from_value)
    }

    /// Index records by identity key. The first occurrence of a key wins;
    /// records without a usable key are skipped.
    pub fn index_by_key(&self) -> HashMap<RecordKey, &Record> {
        let mut index = HashMap::with_capacity(self.records.len());
        for record in &self.records {
            if let Some(key) = self.key_of(record) {
                index.entry(key).or_insert(record);
            }
        }
        index
    }

    /// Declare every undeclared column found in the records.
    ///
    /// A column whose non-null values disagree on type is declared text.
    /// Columns with only null values stay undeclared.
    pub fn infer_schema(&mut self) {
        let mut observed: BTreeMap<&str, Option<ColumnType>> = BTreeMap::new();
        for record in &self.records {
            for (column, value) in record {
                if self.schema.contains(column) {
                    continue;
                }
                let Some(ty) = value.natural_type() else {
                    continue;
                };
                observed
                    .entry(column.as_str())
                    .and_modify(|seen| {
                        if *seen != Some(ty) {
                            *seen = Some(ColumnType::Text);
                        }
                    })
                    .or_insert(Some(ty));
            }
        }
        let inferred: Vec<(String, ColumnType)> = observed
            .into_iter()
            .filter_map(|(column, ty)| ty.map(|ty| (column.to_string(), ty)))
            .collect();
        for (column, ty) in inferred {
            self.schema.insert(column, ty);
        }
    }

    /// Rows whose boolean designation column is true. Null and non-boolean
    /// values count as false. Metadata is not carried into the subset.
    pub fn designated_subset(&self, column: &str) -> Result<Dataset, DatasetError> {
        if !self.schema.contains(column) {
            return Err(DatasetError::MissingColumn(column.to_string()));
        }
        let records = self
            .records
            .iter()
            .filter(|record| {
                record
                    .get(column)
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        Ok(Dataset::new(self.identity_key.clone())
            .with_schema(self.schema.clone())
            .with_records(records))
    }

    /// Load a dataset written by [`Dataset::to_json_file`].
    pub fn from_json_file(path: &Path) -> Result<Self, DatasetError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| DatasetError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the dataset as a JSON snapshot, creating parent directories.
    pub fn to_json_file(&self, path: &Path) -> Result<(), DatasetError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DatasetError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| DatasetError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Build a record from `(column, value)` pairs.
///
/// ```
/// use propflow::dataset::{record, Value};
///
/// let row = record([("opa_id", Value::from("1001")), ("market_value", Value::from(250000.0))]);
/// assert_eq!(row.len(), 2);
/// ```
pub fn record<K, I>(pairs: I) -> Record
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
