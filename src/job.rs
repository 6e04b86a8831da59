//! End-to-end ETL run.
//!
//! [`EtlJob`] wires the collaborators together and runs the phases in order:
//! resolve stage order, load the base dataset, run stages and finalize,
//! export metadata, profile, diff against the previous snapshot, publish the
//! table and the designated geometry subset. The snapshot is read before
//! anything is published.
//!
//! Every fatal error is handed to the reporter's failure sink along with the
//! phase it happened in, then returned. A failed metadata export is only a
//! warning.

use crate::config::{PipelineConfig, SourceFormat};
use crate::dataset::{
    export_metadata_csv, CsvFileSource, Dataset, DatasetSource, JsonFileSource,
};
use crate::diff::{DiffEngine, DiffReport};
use crate::errors::{PipelineError, Result};
use crate::observability::{get_current_context, set_phase, RunContext, RunPhase};
use crate::pipeline::{FinalizationReport, Finalizer, PipelineRunner, StageRegistry, StageTiming};
use crate::progress::implementations::SilentProgressSink;
use crate::progress::traits::ProgressSink;
use crate::publish::{
    FileSnapshotStore, GeoJsonPublisher, JsonTablePublisher, PublishAck, Publisher, SnapshotStore,
};
use crate::report::{DatasetProfile, FailureReport, Reporter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// What a successful run did.
#[derive(Debug)]
pub struct JobSummary {
    pub rows: usize,
    pub timings: Vec<StageTiming>,
    pub finalization: FinalizationReport,
    pub profile: DatasetProfile,
    pub diff: DiffReport,
    pub acks: Vec<PublishAck>,
    /// Non-fatal problems, such as a failed metadata export.
    pub warnings: Vec<String>,
}

/// A fatal error plus the run context at the moment it happened.
struct Failed {
    error: PipelineError,
    context: RunContext,
}

/// Run `f` inside `phase`, capturing the context if it fails.
fn in_phase<T>(phase: RunPhase, f: impl FnOnce() -> Result<T>) -> std::result::Result<T, Failed> {
    let _phase = set_phase(phase);
    f().map_err(|error| {
        let mut context = get_current_context();
        // Finalization runs inside the stages step.
        if matches!(error, PipelineError::Finalization(_)) {
            context.phase = Some(RunPhase::Finalization);
        }
        Failed { error, context }
    })
}

/// Hand a fatal error to the failure sink. Delivery problems are logged.
pub fn report_failure(reporter: &dyn Reporter, error: &PipelineError, context: &RunContext) {
    let failure = FailureReport::from_error(error, context);
    if let Err(e) = reporter.failure(&failure) {
        log::error!("Failed to deliver failure report: {}", e);
    }
}

/// Build the dataset source described by the `[dataset]` section.
pub fn source_from_config(config: &PipelineConfig) -> Box<dyn DatasetSource> {
    let dataset = &config.dataset;
    match dataset.format {
        SourceFormat::Json => Box::new(JsonFileSource::new(
            dataset.source.clone(),
            dataset.identity_key.clone(),
        )),
        SourceFormat::Csv => Box::new(
            CsvFileSource::new(dataset.source.clone(), dataset.identity_key.clone())
                .with_delimiter(u8::try_from(dataset.delimiter).unwrap_or(b','))
                .with_schema(dataset.schema.clone()),
        ),
    }
}

pub struct EtlJob {
    registry: StageRegistry,
    source: Box<dyn DatasetSource>,
    progress: Arc<dyn ProgressSink>,
    finalizer: Finalizer,
    diff_engine: DiffEngine,
    snapshots: Box<dyn SnapshotStore>,
    table_publisher: Box<dyn Publisher>,
    table_sink: String,
    subset: Option<(Box<dyn Publisher>, String)>,
    metadata_path: Option<PathBuf>,
    reporter: Box<dyn Reporter>,
}

impl EtlJob {
    pub fn new(
        source: Box<dyn DatasetSource>,
        snapshots: Box<dyn SnapshotStore>,
        table_publisher: Box<dyn Publisher>,
        table_sink: impl Into<String>,
        reporter: Box<dyn Reporter>,
    ) -> Self {
        Self {
            registry: StageRegistry::new(),
            source,
            progress: Arc::new(SilentProgressSink),
            finalizer: Finalizer::default(),
            diff_engine: DiffEngine::default(),
            snapshots,
            table_publisher,
            table_sink: table_sink.into(),
            subset: None,
            metadata_path: None,
            reporter,
        }
    }

    /// Wire a job from configuration, with file-backed collaborators rooted
    /// at `[output] dir`.
    pub fn from_config(
        config: &PipelineConfig,
        registry: StageRegistry,
        progress: Arc<dyn ProgressSink>,
        reporter: Box<dyn Reporter>,
    ) -> Self {
        let output = &config.output;
        Self::new(
            source_from_config(config),
            Box::new(FileSnapshotStore::new(output.dir.clone())),
            Box::new(JsonTablePublisher::new(output.dir.clone(), output.write_mode)),
            output.table.clone(),
            reporter,
        )
        .with_registry(registry)
        .with_progress(progress)
        .with_finalizer(Finalizer::new(config.finalize.clone()))
        .with_diff_engine(
            DiffEngine::new(config.diff.numeric_tolerance).with_parallel(config.diff.parallel),
        )
        .with_subset_publisher(
            Box::new(GeoJsonPublisher::new(
                output.dir.clone(),
                output.designation_column.clone(),
                output.geometry_column.clone(),
            )),
            output.geometry_sink.clone(),
        )
        .with_metadata_export(output.metadata_path())
    }

    pub fn with_registry(mut self, registry: StageRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_finalizer(mut self, finalizer: Finalizer) -> Self {
        self.finalizer = finalizer;
        self
    }

    pub fn with_diff_engine(mut self, diff_engine: DiffEngine) -> Self {
        self.diff_engine = diff_engine;
        self
    }

    /// Also publish the designated subset to `sink`.
    pub fn with_subset_publisher(mut self, publisher: Box<dyn Publisher>, sink: impl Into<String>) -> Self {
        self.subset = Some((publisher, sink.into()));
        self
    }

    pub fn with_metadata_export(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_path = Some(path.into());
        self
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    pub fn run(&self) -> Result<JobSummary> {
        let _span = tracing::info_span!("etl_job", table = %self.table_sink).entered();
        let start = Instant::now();
        match self.execute() {
            Ok(summary) => {
                log::info!(
                    "Run complete in {:.2?}: {} rows published to '{}'",
                    start.elapsed(),
                    summary.rows,
                    self.table_sink
                );
                Ok(summary)
            }
            Err(Failed { error, context }) => {
                log::error!("Run failed: {}", error);
                report_failure(self.reporter.as_ref(), &error, &context);
                Err(error)
            }
        }
    }

    fn execute(&self) -> std::result::Result<JobSummary, Failed> {
        let order = in_phase(RunPhase::Ordering, || self.registry.resolve_order())?;
        log::debug!(
            "Stage order: {}",
            order.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
        );

        let base = in_phase(RunPhase::Loading, || {
            let dataset = self.source.load().map_err(PipelineError::Source)?;
            log::info!("Loaded {} rows from {}", dataset.len(), self.source.describe());
            Ok(dataset)
        })?;

        let runner = PipelineRunner::new(Arc::clone(&self.progress), self.finalizer.clone());
        let outcome = in_phase(RunPhase::Stages, || runner.run(base, &order))?;
        log::info!("Stages finished in {:.2?}", outcome.total_stage_time());
        for timing in &outcome.timings {
            log::info!("  {:<24} {:.2?}", timing.name, timing.duration);
        }
        let dataset = outcome.dataset;

        let mut warnings = Vec::new();
        if let Some(warning) = self.export_metadata(&dataset) {
            self.progress.warn(&warning);
            warnings.push(warning);
        }

        let profile = in_phase(RunPhase::Profiling, || {
            let profile = DatasetProfile::from_dataset(self.table_sink.as_str(), &dataset);
            self.reporter.profile(&profile)?;
            Ok(profile)
        })?;

        let previous = in_phase(RunPhase::Diff, || {
            self.snapshots
                .load_previous(&self.table_sink)
                .map_err(PipelineError::Snapshot)
        })?;
        let diff = in_phase(RunPhase::Diff, || {
            let _span = tracing::info_span!("diff", rows = dataset.len()).entered();
            Ok(self.diff_engine.diff(&dataset, previous.as_ref()))
        })?;
        in_phase(RunPhase::Reporting, || Ok(self.reporter.diff(&diff)?))?;

        let acks = in_phase(RunPhase::Publication, || self.publish(&dataset))?;
        if let Err(e) = self.reporter.publication(&acks) {
            let warning = format!("publication report failed: {}", e);
            log::warn!("{}", warning);
            self.progress.warn(&warning);
            warnings.push(warning);
        }

        Ok(JobSummary {
            rows: dataset.len(),
            timings: outcome.timings,
            finalization: outcome.finalization,
            profile,
            diff,
            acks,
            warnings,
        })
    }

    fn export_metadata(&self, dataset: &Dataset) -> Option<String> {
        let path = self.metadata_path.as_ref()?;
        let _phase = set_phase(RunPhase::MetadataExport);
        match export_metadata_csv(&dataset.metadata, path) {
            Ok(()) => {
                log::info!(
                    "Exported {} metadata entries to {}",
                    dataset.metadata.len(),
                    path.display()
                );
                None
            }
            Err(e) => {
                let warning = format!("metadata export failed: {}", e);
                log::warn!("{}", warning);
                Some(warning)
            }
        }
    }

    fn publish(&self, dataset: &Dataset) -> Result<Vec<PublishAck>> {
        let mut acks = vec![self.table_publisher.publish(dataset, &self.table_sink)?];
        if let Some((publisher, sink)) = &self.subset {
            acks.push(publisher.publish(dataset, sink)?);
        }
        Ok(acks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{record, DatasetError, Value};
    use crate::pipeline::{FinalizationConfig, FnStage};
    use crate::publish::{PublishError, WriteMode};
    use crate::report::testing::RecordingReporter;
    use crate::report::ReportError;

    struct StaticSource(Dataset);

    impl DatasetSource for StaticSource {
        fn load(&self) -> std::result::Result<Dataset, DatasetError> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "static".to_string()
        }
    }

    struct RejectingPublisher;

    impl Publisher for RejectingPublisher {
        fn publish(&self, _: &Dataset, sink: &str) -> std::result::Result<PublishAck, PublishError> {
            Err(PublishError::InvalidSink(sink.to_string()))
        }
    }

    fn base() -> Dataset {
        let mut ds = Dataset::new("opa_id").with_records(vec![
            record([("opa_id", Value::from("1")), ("val", Value::from(1.0))]),
            record([("opa_id", Value::from("2")), ("val", Value::from(2.0))]),
        ]);
        ds.infer_schema();
        ds
    }

    fn job(dir: &std::path::Path, reporter: RecordingReporter) -> EtlJob {
        EtlJob::new(
            Box::new(StaticSource(base())),
            Box::new(FileSnapshotStore::new(dir)),
            Box::new(JsonTablePublisher::new(dir, WriteMode::Replace)),
            "props",
            Box::new(reporter),
        )
        .with_finalizer(Finalizer::new(FinalizationConfig::dedup_only()))
    }

    #[test]
    fn test_first_run_then_unchanged_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = RecordingReporter::default();

        let first = job(dir.path(), reporter.clone()).run().unwrap();
        assert!(first.diff.first_run);
        assert_eq!(first.diff.summary.added, 2);
        assert_eq!(first.acks[0].rows_written, 2);

        let second = job(dir.path(), reporter.clone()).run().unwrap();
        assert!(!second.diff.first_run);
        assert_eq!(second.diff.summary.unchanged, 2);
        assert_eq!(reporter.diffs.lock().unwrap().len(), 2);
        assert_eq!(reporter.profiles.lock().unwrap().len(), 2);
        assert!(reporter.failures.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stage_failure_is_reported_with_phase_and_nothing_published() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = RecordingReporter::default();
        let mut registry = StageRegistry::new();
        registry
            .register(FnStage::new("vacant", |_: Dataset| {
                Err(anyhow::anyhow!("lookup service unavailable"))
            }))
            .unwrap();

        let err = job(dir.path(), reporter.clone())
            .with_registry(registry)
            .run()
            .unwrap_err();

        assert_eq!(err.kind(), "StageFailure");
        let failures = reporter.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].phase, Some(RunPhase::Stages));
        assert_eq!(failures[0].stage.as_deref(), Some("vacant"));
        assert_eq!(failures[0].root_cause(), "lookup service unavailable");
        assert!(!dir.path().join("props.json").exists());
    }

    #[test]
    fn test_publish_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = RecordingReporter::default();

        let err = job(dir.path(), reporter.clone())
            .with_subset_publisher(Box::new(RejectingPublisher), "vacant_properties")
            .run()
            .unwrap_err();

        assert_eq!(err.kind(), "PublishError");
        let failures = reporter.failures.lock().unwrap();
        assert_eq!(failures[0].phase, Some(RunPhase::Publication));
    }

    #[test]
    fn test_metadata_export_failure_is_only_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let summary = job(dir.path(), RecordingReporter::default())
            .with_metadata_export(blocker.join("metadata.csv"))
            .run()
            .unwrap();

        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].starts_with("metadata export failed"));
        assert!(dir.path().join("props.json").exists());
    }

    #[test]
    fn test_publication_stats_follow_publish() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = RecordingReporter::default();

        let summary = job(dir.path(), reporter.clone()).run().unwrap();

        let publications = reporter.publications.lock().unwrap();
        assert_eq!(publications.len(), 1);
        assert_eq!(publications[0], summary.acks);
        assert!(summary.warnings.is_empty());
    }

    #[test]
    fn test_publication_report_failure_is_only_a_warning() {
        struct StatsUnavailable;

        impl Reporter for StatsUnavailable {
            fn profile(&self, _: &DatasetProfile) -> std::result::Result<(), ReportError> {
                Ok(())
            }

            fn diff(&self, _: &DiffReport) -> std::result::Result<(), ReportError> {
                Ok(())
            }

            fn publication(&self, _: &[PublishAck]) -> std::result::Result<(), ReportError> {
                Err(ReportError::Io {
                    path: "stats".into(),
                    source: std::io::Error::other("channel closed"),
                })
            }

            fn failure(&self, _: &FailureReport) -> std::result::Result<(), ReportError> {
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let summary = EtlJob::new(
            Box::new(StaticSource(base())),
            Box::new(FileSnapshotStore::new(dir.path())),
            Box::new(JsonTablePublisher::new(dir.path(), WriteMode::Replace)),
            "props",
            Box::new(StatsUnavailable),
        )
        .with_finalizer(Finalizer::new(FinalizationConfig::dedup_only()))
        .run()
        .unwrap();

        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].starts_with("publication report failed"));
        assert!(dir.path().join("props.json").exists());
    }

    #[test]
    fn test_finalization_error_reports_finalization_phase() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = RecordingReporter::default();

        let err = job(dir.path(), reporter.clone())
            .with_finalizer(Finalizer::new(FinalizationConfig {
                numeric_columns: vec!["market_value".to_string()],
                text_columns: vec![],
            }))
            .run()
            .unwrap_err();

        assert_eq!(err.kind(), "FinalizationError");
        assert_eq!(
            reporter.failures.lock().unwrap()[0].phase,
            Some(RunPhase::Finalization)
        );
    }
}
