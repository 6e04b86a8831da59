use crate::dataset::{Dataset, DatasetError};
use std::path::PathBuf;

/// Source of the previously published dataset.
pub trait SnapshotStore: Send + Sync {
    /// The last published dataset for `sink`, or `None` on a first run.
    fn load_previous(&self, sink: &str) -> Result<Option<Dataset>, DatasetError>;
}

/// Reads the table file written by [`super::JsonTablePublisher`].
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn snapshot_path(&self, sink: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sink))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load_previous(&self, sink: &str) -> Result<Option<Dataset>, DatasetError> {
        let path = self.snapshot_path(sink);
        if !path.exists() {
            log::info!("No previous snapshot at {}", path.display());
            return Ok(None);
        }
        let dataset = Dataset::from_json_file(&path)?;
        log::debug!(
            "Loaded previous snapshot with {} rows from {}",
            dataset.len(),
            path.display()
        );
        Ok(Some(dataset))
    }
}
