use super::{DatasetProfile, FailureReport, ReportError, Reporter};
use crate::diff::DiffReport;
use crate::publish::PublishAck;

/// Writes one-line summaries through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn profile(&self, profile: &DatasetProfile) -> Result<(), ReportError> {
        log::info!(
            "Profile '{}': {} rows, {} columns",
            profile.name,
            profile.rows,
            profile.columns.len()
        );
        for column in profile.columns.iter().filter(|c| c.nulls > 0) {
            log::debug!(
                "  {}: {} nulls ({:.1}%)",
                column.name,
                column.nulls,
                column.null_fraction() * 100.0
            );
        }
        Ok(())
    }

    fn diff(&self, report: &DiffReport) -> Result<(), ReportError> {
        let s = &report.summary;
        if report.first_run {
            log::info!("Diff: first run, {} rows added", s.added);
        } else {
            log::info!(
                "Diff: {} added, {} removed, {} changed, {} unchanged",
                s.added,
                s.removed,
                s.changed,
                s.unchanged
            );
        }
        for drift in &report.schema_drift {
            log::warn!("Schema drift on '{}': {}", drift.column, drift.kind.as_str());
        }
        Ok(())
    }

    fn publication(&self, acks: &[PublishAck]) -> Result<(), ReportError> {
        let rows: usize = acks.iter().map(|a| a.rows_written).sum();
        log::info!("Published {} rows across {} sinks", rows, acks.len());
        for ack in acks {
            log::info!("  {:<24} {:>8} rows -> {}", ack.sink, ack.rows_written, ack.location);
        }
        Ok(())
    }

    fn failure(&self, failure: &FailureReport) -> Result<(), ReportError> {
        let phase = failure
            .phase
            .map_or_else(|| "unknown".to_string(), |p| p.to_string());
        log::error!(
            "[{}] {} during {}: {}",
            failure.code,
            failure.kind,
            phase,
            failure.message
        );
        for cause in failure.chain.iter().skip(1) {
            log::error!("  caused by: {}", cause);
        }
        Ok(())
    }
}
