//! Dataset sources.
//!
//! A source hands the pipeline an already-loaded [`Dataset`]. Acquisition
//! from real upstream systems lives outside this crate; the file sources here
//! cover local JSON snapshots and delimited exports.

use super::{ColumnType, Dataset, DatasetError, MetadataEntry, Record, Schema, Value};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub trait DatasetSource: Send + Sync {
    /// Load the base dataset.
    fn load(&self) -> Result<Dataset, DatasetError>;

    /// Human-readable description used in logs.
    fn describe(&self) -> String;
}

/// Reads a JSON dataset: either a full snapshot object or a bare array of
/// record objects.
///
/// The configured identity key always wins over one recorded in the file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    identity_key: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonDocument {
    Records(Vec<Record>),
    Snapshot {
        #[serde(default)]
        schema: Schema,
        records: Vec<Record>,
        #[serde(default)]
        metadata: Vec<MetadataEntry>,
    },
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>, identity_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            identity_key: identity_key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for JsonFileSource {
    fn load(&self) -> Result<Dataset, DatasetError> {
        let contents =
            std::fs::read_to_string(&self.path).map_err(|source| DatasetError::Read {
                path: self.path.clone(),
                source,
            })?;
        let document: JsonDocument =
            serde_json::from_str(&contents).map_err(|source| DatasetError::Json {
                path: self.path.clone(),
                source,
            })?;

        let mut dataset = match document {
            JsonDocument::Snapshot {
                schema,
                records,
                metadata,
            } => {
                let mut ds = Dataset::new(self.identity_key.clone())
                    .with_schema(schema)
                    .with_records(records);
                ds.metadata = metadata;
                ds
            }
            JsonDocument::Records(records) => {
                Dataset::new(self.identity_key.clone()).with_records(records)
            }
        };
        dataset.infer_schema();

        log::debug!(
            "Loaded {} records from {}",
            dataset.len(),
            self.path.display()
        );
        Ok(dataset)
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// Reads a delimited text file with a header row.
///
/// Fields are typed from the declared schema when one is supplied; otherwise
/// each field is inferred on its own (boolean, number, then text).
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
    identity_key: String,
    delimiter: u8,
    declared: Schema,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>, identity_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            identity_key: identity_key.into(),
            delimiter: b',',
            declared: Schema::new(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_schema(mut self, declared: Schema) -> Self {
        self.declared = declared;
        self
    }

    fn csv_error(&self, source: csv::Error) -> DatasetError {
        DatasetError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

impl DatasetSource for CsvFileSource {
    fn load(&self) -> Result<Dataset, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_path(&self.path)
            .map_err(|e| self.csv_error(e))?;

        let headers = reader.headers().map_err(|e| self.csv_error(e))?.clone();
        // Identity keys are identifiers, never quantities: "007" must stay "007".
        let column_types: Vec<Option<ColumnType>> = headers
            .iter()
            .map(|h| {
                if h == self.identity_key {
                    Some(self.declared.get(h).unwrap_or(ColumnType::Text))
                } else {
                    self.declared.get(h)
                }
            })
            .collect();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| self.csv_error(e))?;
            let record: Record = headers
                .iter()
                .zip(row.iter())
                .zip(&column_types)
                .map(|((column, raw), declared)| {
                    (column.to_string(), Value::parse_field(raw, *declared))
                })
                .collect();
            records.push(record);
        }

        let mut schema = self.declared.clone();
        if !schema.contains(&self.identity_key) && headers.iter().any(|h| h == self.identity_key) {
            schema.insert(self.identity_key.clone(), ColumnType::Text);
        }
        let mut dataset = Dataset::new(self.identity_key.clone())
            .with_schema(schema)
            .with_records(records);
        dataset.infer_schema();

        log::debug!(
            "Loaded {} records ({} columns) from {}",
            dataset.len(),
            headers.len(),
            self.path.display()
        );
        Ok(dataset)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RecordKey;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_temp(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_json_source_accepts_bare_array() {
        let file = write_temp(
            r#"[{"opa_id": "1", "market_value": 100}, {"opa_id": "2", "market_value": null}]"#,
            ".json",
        );
        let ds = JsonFileSource::new(file.path(), "opa_id").load().unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.schema.get("market_value"), Some(ColumnType::Numeric));
        assert_eq!(ds.identity_key, "opa_id");
    }

    #[test]
    fn test_json_source_accepts_snapshot_and_overrides_key() {
        let file = write_temp(
            indoc! {r#"
                {
                  "identity_key": "parcel",
                  "schema": {"opa_id": "text", "zip": "text"},
                  "records": [{"opa_id": "9", "zip": "19104"}]
                }
            "#},
            ".json",
        );
        let ds = JsonFileSource::new(file.path(), "opa_id").load().unwrap();
        assert_eq!(ds.identity_key, "opa_id");
        assert_eq!(ds.schema.get("zip"), Some(ColumnType::Text));
        assert_eq!(ds.key_of(&ds.records[0]), Some(RecordKey::from("9")));
    }

    #[test]
    fn test_csv_source_keeps_identity_as_text() {
        let file = write_temp(
            indoc! {"
                opa_id,market_value,vacant,owner
                007,125000,true,
                008,abc,false,SMITH JOHN
            "},
            ".csv",
        );
        let ds = CsvFileSource::new(file.path(), "opa_id").load().unwrap();
        assert_eq!(ds.records[0].get("opa_id"), Some(&Value::text("007")));
        assert_eq!(ds.records[0].get("market_value"), Some(&Value::Number(125000.0)));
        assert_eq!(ds.records[0].get("owner"), Some(&Value::Null));
        assert_eq!(ds.records[1].get("market_value"), Some(&Value::text("abc")));
        assert_eq!(ds.schema.get("market_value"), Some(ColumnType::Text));
        assert_eq!(ds.schema.get("vacant"), Some(ColumnType::Boolean));
    }

    #[test]
    fn test_csv_source_honors_declared_schema() {
        let file = write_temp("opa_id;market_value\n1;n/a\n2;300\n", ".csv");
        let declared: Schema = [("market_value".to_string(), ColumnType::Numeric)]
            .into_iter()
            .collect();
        let ds = CsvFileSource::new(file.path(), "opa_id")
            .with_delimiter(b';')
            .with_schema(declared)
            .load()
            .unwrap();
        assert_eq!(ds.records[0].get("market_value"), Some(&Value::Null));
        assert_eq!(ds.records[1].get("market_value"), Some(&Value::Number(300.0)));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = JsonFileSource::new("/nonexistent/propflow.json", "opa_id")
            .load()
            .unwrap_err();
        assert!(matches!(err, DatasetError::Read { .. }));
    }
}
