//! Sequential stage execution and finalization.

use super::finalize::{FinalizationReport, Finalizer};
use super::stage::{Stage, StageTiming};
use crate::dataset::Dataset;
use crate::errors::{PipelineError, Result};
use crate::observability::{
    increment_stages_completed, set_current_stage, set_phase, set_stage_progress, RunPhase,
};
use crate::progress::implementations::SilentProgressSink;
use crate::progress::traits::ProgressSink;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a successful run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The finalized dataset.
    pub dataset: Dataset,
    pub timings: Vec<StageTiming>,
    pub finalization: FinalizationReport,
}

impl RunOutcome {
    pub fn total_stage_time(&self) -> Duration {
        self.timings.iter().map(|t| t.duration).sum()
    }
}

/// Threads a dataset through stages in the given order, then finalizes it.
///
/// The runner stops at the first failing stage; later stages never start
/// and nothing is persisted. It never reorders stages, but it refuses to
/// apply a stage whose dependencies have not run yet.
pub struct PipelineRunner {
    progress: Arc<dyn ProgressSink>,
    finalizer: Finalizer,
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new(Arc::new(SilentProgressSink), Finalizer::default())
    }
}

impl PipelineRunner {
    pub fn new(progress: Arc<dyn ProgressSink>, finalizer: Finalizer) -> Self {
        Self {
            progress,
            finalizer,
        }
    }

    pub fn run(&self, initial: Dataset, stages: &[Arc<dyn Stage>]) -> Result<RunOutcome> {
        let total = stages.len();
        self.progress.begin_run(total);
        set_stage_progress(0, total);

        let mut dataset = initial;
        let mut timings = Vec::with_capacity(total);
        let mut executed: HashSet<&str> = HashSet::with_capacity(total);

        {
            let _phase = set_phase(RunPhase::Stages);
            for (i, stage) in stages.iter().enumerate() {
                let name = stage.name();
                let missing: Vec<String> = stage
                    .dependencies()
                    .iter()
                    .filter(|dep| !executed.contains(dep.as_str()))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    return Err(PipelineError::DependencyNotSatisfied {
                        stage: name.to_string(),
                        missing,
                    });
                }

                let span = tracing::info_span!("stage", name = name, index = i + 1, total = total);
                let _enter = span.enter();
                let _stage = set_current_stage(name);

                self.progress.start_stage(name);
                let start = Instant::now();
                let rows_before = dataset.len();

                dataset = match stage.apply(dataset) {
                    Ok(next) => next,
                    Err(cause) => {
                        self.progress.fail_stage(name);
                        log::error!("Stage '{}' failed: {:#}", name, cause);
                        return Err(PipelineError::stage_failure(name, cause));
                    }
                };

                let duration = start.elapsed();
                log::debug!(
                    "Stage '{}' finished in {:.2?} ({} -> {} rows)",
                    name,
                    duration,
                    rows_before,
                    dataset.len()
                );
                timings.push(StageTiming {
                    name: name.to_string(),
                    duration,
                });
                executed.insert(name);
                increment_stages_completed();
                self.progress.complete_stage(name);
            }
        }

        let (dataset, finalization) = {
            let _phase = set_phase(RunPhase::Finalization);
            let _span = tracing::info_span!("finalize", rows = dataset.len()).entered();
            self.finalizer.finalize(dataset)?
        };
        self.progress.finish_run();

        Ok(RunOutcome {
            dataset,
            timings,
            finalization,
        })
    }
}
