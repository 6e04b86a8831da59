//! Per-stage metadata collected while a dataset moves through the pipeline.

use super::DatasetError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// One `{stage_name, description, value}` entry.
///
/// Entries are append-only; the full sequence is exported verbatim at the
/// end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub stage_name: String,
    pub description: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(
        stage_name: impl Into<String>,
        description: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            stage_name: stage_name.into(),
            description: description.into(),
            value: value.to_string(),
        }
    }
}

/// Write entries as delimited text with a `stage_name,description,value`
/// header row.
pub fn write_metadata_csv<W: Write>(entries: &[MetadataEntry], writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    // Header is written explicitly so an empty export still carries it.
    csv_writer.write_record(["stage_name", "description", "value"])?;
    for entry in entries {
        csv_writer.write_record([&entry.stage_name, &entry.description, &entry.value])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Export entries to a CSV file, creating parent directories as needed.
pub fn export_metadata_csv(entries: &[MetadataEntry], path: &Path) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| DatasetError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = std::fs::File::create(path).map_err(|source| DatasetError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_metadata_csv(entries, file).map_err(|source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    })
}
