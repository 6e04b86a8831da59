use super::{validate_sink, write_atomically, PublishAck, PublishError, Publisher};
use crate::dataset::{Dataset, RecordKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How a publish treats an existing table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Overwrite the table.
    #[default]
    Replace,
    /// Merge by identity key: existing keys are overwritten in place, new
    /// keys are appended.
    Append,
}

/// Publishes a dataset as a JSON snapshot file `<dir>/<sink>.json`.
///
/// The file is also what [`super::FileSnapshotStore`] reads back as the
/// previous snapshot on the next run.
#[derive(Debug, Clone)]
pub struct JsonTablePublisher {
    dir: PathBuf,
    mode: WriteMode,
}

impl JsonTablePublisher {
    pub fn new(dir: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            dir: dir.into(),
            mode,
        }
    }

    pub fn table_path(&self, sink: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sink))
    }

    fn merge_into_existing(&self, path: &Path, dataset: &Dataset) -> Result<Dataset, PublishError> {
        if !path.exists() {
            return Ok(dataset.clone());
        }
        let mut merged = Dataset::from_json_file(path)?;
        if merged.identity_key != dataset.identity_key {
            log::warn!(
                "Existing table keyed by '{}', appending rows keyed by '{}'",
                merged.identity_key,
                dataset.identity_key
            );
            merged.identity_key = dataset.identity_key.clone();
        }

        let mut positions: HashMap<RecordKey, usize> = merged
            .records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| merged.key_of(r).map(|k| (k, i)))
            .collect();
        for record in &dataset.records {
            match dataset.key_of(record) {
                Some(key) => match positions.get(&key) {
                    Some(&i) => merged.records[i] = record.clone(),
                    None => {
                        positions.insert(key, merged.records.len());
                        merged.records.push(record.clone());
                    }
                },
                None => merged.records.push(record.clone()),
            }
        }
        for (column, column_type) in dataset.schema.iter() {
            merged.schema.insert(column, column_type);
        }
        merged.metadata = dataset.metadata.clone();
        Ok(merged)
    }
}

impl Publisher for JsonTablePublisher {
    fn publish(&self, dataset: &Dataset, sink: &str) -> Result<PublishAck, PublishError> {
        validate_sink(sink)?;
        let path = self.table_path(sink);

        let rows_written = dataset.len();
        let encoded = match self.mode {
            WriteMode::Replace => serde_json::to_vec_pretty(dataset),
            WriteMode::Append => {
                let merged = self.merge_into_existing(&path, dataset)?;
                log::debug!(
                    "Appending {} rows to '{}' ({} rows after merge)",
                    rows_written,
                    sink,
                    merged.len()
                );
                serde_json::to_vec_pretty(&merged)
            }
        }
        .map_err(|source| PublishError::Encode {
            sink: sink.to_string(),
            source,
        })?;
        write_atomically(&path, &encoded)?;

        log::info!(
            "Published {} rows to {} ({:?})",
            rows_written,
            path.display(),
            self.mode
        );
        Ok(PublishAck {
            sink: sink.to_string(),
            location: path.display().to_string(),
            rows_written,
        })
    }
}
