use super::{emit, render_diff};
use crate::cli::args::OutputFormat;
use crate::config::PipelineConfig;
use crate::job::{report_failure, EtlJob, JobSummary};
use crate::observability::{get_current_context, set_phase, RunPhase};
use crate::progress::ProgressManager;
use crate::report::{CompositeReporter, ConsoleReporter, FileReporter, LogReporter};
use crate::stages::build_registry;
use anyhow::Result;
use colored::*;

pub fn handle_run(
    config: PipelineConfig,
    progress: &ProgressManager,
    format: OutputFormat,
) -> Result<JobSummary> {
    let reporter = reporter_for(&config, format);

    let registry = {
        let _phase = set_phase(RunPhase::Ordering);
        match build_registry(&config.stages) {
            Ok(registry) => registry,
            Err(e) => {
                report_failure(&reporter, &e, &get_current_context());
                return Err(e.into());
            }
        }
    };

    let job = EtlJob::from_config(&config, registry, progress.stage_sink(), Box::new(reporter));
    let summary = job.run();
    let _ = progress.clear();
    let summary = summary?;

    match format {
        OutputFormat::Terminal => print_summary(&summary),
        other => emit(&render_diff(&summary.diff, other)?, None)?,
    }
    Ok(summary)
}

/// Logs and report files always. The console reporter is added only for
/// terminal output; otherwise stdout carries the rendered diff alone.
fn reporter_for(config: &PipelineConfig, format: OutputFormat) -> CompositeReporter {
    let mut reporter = CompositeReporter::new()
        .with(LogReporter)
        .with(FileReporter::new(config.output.reports_path()));
    if format == OutputFormat::Terminal {
        reporter.push(Box::new(ConsoleReporter));
    }
    reporter
}

fn print_summary(summary: &JobSummary) {
    println!();
    println!("{}", "Published".bold().green());
    for ack in &summary.acks {
        println!("  {:<24} {:>8} rows  {}", ack.sink, ack.rows_written, ack.location.dimmed());
    }
    let f = &summary.finalization;
    if f.duplicates_dropped + f.null_keys_dropped + f.values_nulled > 0 {
        println!(
            "  {} duplicates dropped, {} rows without a key dropped, {} values nulled",
            f.duplicates_dropped, f.null_keys_dropped, f.values_nulled
        );
    }
    for warning in &summary.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
}
