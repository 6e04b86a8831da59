use super::{DatasetProfile, FailureReport, ReportError, Reporter};
use crate::diff::{format_diff_markdown, DiffReport};
use crate::publish::PublishAck;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DIFF_JSON: &str = "diff_report.json";
pub const DIFF_MARKDOWN: &str = "diff_report.md";
pub const FAILURE_JSON: &str = "failure.json";
pub const PUBLICATION_JSON: &str = "publication.json";

/// Writes report artifacts into a directory:
///
/// - `profile_<name>.json`
/// - `diff_report.json` and `diff_report.md`
/// - `publication.json`
/// - `failure.json`
///
/// Files from a previous run are overwritten.
#[derive(Debug, Clone)]
pub struct FileReporter {
    dir: PathBuf,
}

impl FileReporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("profile_{}.json", name))
    }

    fn write(&self, file_name: &str, contents: &str) -> Result<(), ReportError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ReportError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, contents).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }

    fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(value)?;
        self.write(file_name, &json)
    }
}

impl Reporter for FileReporter {
    fn profile(&self, profile: &DatasetProfile) -> Result<(), ReportError> {
        self.write_json(&format!("profile_{}.json", profile.name), profile)
    }

    fn diff(&self, report: &DiffReport) -> Result<(), ReportError> {
        self.write_json(DIFF_JSON, report)?;
        self.write(DIFF_MARKDOWN, &format_diff_markdown(report))
    }

    fn publication(&self, acks: &[PublishAck]) -> Result<(), ReportError> {
        self.write_json(PUBLICATION_JSON, &acks)
    }

    fn failure(&self, failure: &FailureReport) -> Result<(), ReportError> {
        self.write_json(FAILURE_JSON, failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{record, Dataset, Value};
    use crate::diff::DiffEngine;

    #[test]
    fn test_writes_profile_and_diff_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = FileReporter::new(dir.path().join("reports"));

        let mut current = Dataset::new("opa_id")
            .with_records(vec![record([("opa_id", Value::from("1"))])]);
        current.infer_schema();

        reporter
            .profile(&DatasetProfile::from_dataset("props", &current))
            .unwrap();
        reporter
            .diff(&DiffEngine::default().diff(&current, None))
            .unwrap();

        assert!(reporter.profile_path("props").exists());
        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(reporter.dir().join(DIFF_JSON)).unwrap(),
        )
        .unwrap();
        assert_eq!(json["first_run"], true);
        assert_eq!(json["summary"]["added"], 1);
        let markdown = std::fs::read_to_string(reporter.dir().join(DIFF_MARKDOWN)).unwrap();
        assert!(markdown.starts_with("# Dataset Diff Report"));
    }

    #[test]
    fn test_writes_publication_stats() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = FileReporter::new(dir.path());
        let acks = vec![PublishAck {
            sink: "vacant_properties".to_string(),
            location: "out/vacant_properties.geojson".to_string(),
            rows_written: 12,
        }];

        reporter.publication(&acks).unwrap();

        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(PUBLICATION_JSON)).unwrap(),
        )
        .unwrap();
        assert_eq!(json[0]["sink"], "vacant_properties");
        assert_eq!(json[0]["rows_written"], 12);
    }
}
