use super::{emit, render_diff};
use crate::cli::args::OutputFormat;
use crate::config::PipelineConfig;
use crate::dataset::{DatasetSource, JsonFileSource};
use crate::diff::{DiffEngine, DiffReport};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub struct DiffOptions {
    pub current: PathBuf,
    pub previous: Option<PathBuf>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub tolerance: Option<f64>,
}

/// Diff two snapshot files using the configured identity key.
pub fn handle_diff(config: &PipelineConfig, options: DiffOptions) -> Result<DiffReport> {
    let identity_key = config.dataset.identity_key.as_str();
    let load = |path: &Path| {
        JsonFileSource::new(path, identity_key)
            .load()
            .with_context(|| format!("Failed to load snapshot {}", path.display()))
    };

    let current = load(&options.current)?;
    let previous = options.previous.as_deref().map(load).transpose()?;

    let tolerance = options.tolerance.unwrap_or(config.diff.numeric_tolerance);
    if !(tolerance.is_finite() && tolerance >= 0.0) {
        anyhow::bail!("tolerance must be a non-negative number, got {}", tolerance);
    }
    let engine = DiffEngine::new(tolerance).with_parallel(config.diff.parallel);
    let report = engine.diff(&current, previous.as_ref());

    emit(&render_diff(&report, options.format)?, options.output.as_deref())?;
    Ok(report)
}
