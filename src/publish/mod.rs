//! Publication of finalized datasets.
//!
//! The core hands a [`Publisher`] the finalized dataset and a sink name and
//! gets an acknowledgement back. Failures are returned as-is; retry policy
//! belongs to whoever operates the real backend.

pub mod geojson;
pub mod snapshot;
pub mod table;

pub use geojson::GeoJsonPublisher;
pub use snapshot::{FileSnapshotStore, SnapshotStore};
pub use table::{JsonTablePublisher, WriteMode};

use crate::dataset::{Dataset, DatasetError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid sink name '{0}'")]
    InvalidSink(String),

    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode output for sink '{sink}'")]
    Encode {
        sink: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Acknowledgement for one published sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishAck {
    pub sink: String,
    /// Where the data landed (file path, table name, ...).
    pub location: String,
    pub rows_written: usize,
}

pub trait Publisher: Send + Sync {
    fn publish(&self, dataset: &Dataset, sink: &str) -> Result<PublishAck, PublishError>;
}

/// Sink names become file stems: non-empty, no path separators, no leading
/// dot.
pub(crate) fn validate_sink(sink: &str) -> Result<(), PublishError> {
    let valid = !sink.is_empty()
        && !sink.starts_with('.')
        && !sink.contains(['/', '\\'])
        && !sink.contains("..");
    if valid {
        Ok(())
    } else {
        Err(PublishError::InvalidSink(sink.to_string()))
    }
}

/// Write `contents` through a sibling temporary file so readers never see
/// a partial file.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), PublishError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let tmp = path.with_extension("partial");
    std::fs::write(&tmp, contents).map_err(io_err(&tmp))?;
    std::fs::rename(&tmp, path).map_err(io_err(path))
}

pub(crate) fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PublishError {
    let path = path.to_path_buf();
    move |source| PublishError::Io { path, source }
}
