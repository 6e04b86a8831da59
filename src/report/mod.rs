//! Reporting boundary.
//!
//! A [`Reporter`] receives the dataset profile after finalization, the diff
//! report, the publish acknowledgements once the data has landed, and a
//! [`FailureReport`] when a run ends with a fatal error.
//! Message formatting for any particular channel stays outside the core.

pub mod console;
pub mod failure;
pub mod file;
pub mod log_reporter;
pub mod profile;

pub use console::ConsoleReporter;
pub use failure::FailureReport;
pub use file::FileReporter;
pub use log_reporter::LogReporter;
pub use profile::{ColumnProfile, DatasetProfile};

use crate::diff::DiffReport;
use crate::publish::PublishAck;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode report")]
    Encode(#[from] serde_json::Error),
}

pub trait Reporter: Send + Sync {
    fn profile(&self, profile: &DatasetProfile) -> Result<(), ReportError>;

    fn diff(&self, report: &DiffReport) -> Result<(), ReportError>;

    /// Storage statistics after every sink was written. The data is already
    /// published, so the caller treats an error here as a warning.
    fn publication(&self, _acks: &[PublishAck]) -> Result<(), ReportError> {
        Ok(())
    }

    /// Called once when a run fails. Implementations should not panic; the
    /// caller only logs errors returned here.
    fn failure(&self, failure: &FailureReport) -> Result<(), ReportError>;
}

/// Fans every report out to several reporters.
///
/// All reporters are called even when one fails; the first error is
/// returned.
#[derive(Default)]
pub struct CompositeReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl CompositeReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn push(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    fn each<F>(&self, mut f: F) -> Result<(), ReportError>
    where
        F: FnMut(&dyn Reporter) -> Result<(), ReportError>,
    {
        let mut first_error = None;
        for reporter in &self.reporters {
            if let Err(e) = f(reporter.as_ref()) {
                log::warn!("Reporter failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Reporter for CompositeReporter {
    fn profile(&self, profile: &DatasetProfile) -> Result<(), ReportError> {
        self.each(|r| r.profile(profile))
    }

    fn diff(&self, report: &DiffReport) -> Result<(), ReportError> {
        self.each(|r| r.diff(report))
    }

    fn publication(&self, acks: &[PublishAck]) -> Result<(), ReportError> {
        self.each(|r| r.publication(acks))
    }

    fn failure(&self, failure: &FailureReport) -> Result<(), ReportError> {
        self.each(|r| r.failure(failure))
    }
}
