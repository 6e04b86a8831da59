//! Human-readable renderings of a [`DiffReport`].
//!
//! JSON output is plain serde serialization of the report itself.

use super::{DiffReport, DriftKind};
use colored::*;
use std::fmt::Write as _;

/// Keys listed per section before the rest are summarized as a count.
const MAX_LISTED_KEYS: usize = 25;

/// Format a diff report as markdown.
pub fn format_diff_markdown(report: &DiffReport) -> String {
    let mut md = String::new();

    md.push_str("# Dataset Diff Report\n\n");
    if report.first_run {
        md.push_str("[FIRST RUN] No previous snapshot; every record is new.\n\n");
    }

    md.push_str("## Summary\n\n");
    md.push_str("| | Count |\n|---|---:|\n");
    md.push_str(&format!("| Added | {} |\n", report.summary.added));
    md.push_str(&format!("| Removed | {} |\n", report.summary.removed));
    md.push_str(&format!("| Changed | {} |\n", report.summary.changed));
    md.push_str(&format!("| Unchanged | {} |\n", report.summary.unchanged));
    md.push_str(&format!(
        "\nRows: {} previous -> {} current. Numeric tolerance: {}.\n",
        report.summary.previous_rows, report.summary.current_rows, report.tolerance
    ));

    if !report.schema_drift.is_empty() {
        md.push_str("\n## Schema Drift\n\n");
        for drift in &report.schema_drift {
            let detail = match drift.kind {
                DriftKind::AddedColumn => format!(
                    "added ({})",
                    drift.current_type.map(|t| t.as_str()).unwrap_or("?")
                ),
                DriftKind::RemovedColumn => format!(
                    "removed (was {})",
                    drift.previous_type.map(|t| t.as_str()).unwrap_or("?")
                ),
                DriftKind::TypeMismatch => format!(
                    "type changed {} -> {} (not compared)",
                    drift.previous_type.map(|t| t.as_str()).unwrap_or("?"),
                    drift.current_type.map(|t| t.as_str()).unwrap_or("?")
                ),
            };
            md.push_str(&format!("- `{}`: {}\n", drift.column, detail));
        }
    }

    if !report.first_run {
        push_key_list(&mut md, "Added", report.added.iter().map(|k| k.as_str()));
    }
    push_key_list(&mut md, "Removed", report.removed.iter().map(|k| k.as_str()));

    if !report.changed.is_empty() {
        md.push_str("\n## Changes by Column\n\n");
        for (column, count) in report.changes_by_column() {
            md.push_str(&format!("- `{}`: {} record(s)\n", column, count));
        }

        md.push_str("\n## Changed Records\n\n");
        for (key, deltas) in report.changed.iter().take(MAX_LISTED_KEYS) {
            md.push_str(&format!("### `{}`\n\n", key));
            for delta in deltas {
                md.push_str(&format!(
                    "- `{}`: {} -> {}\n",
                    delta.column, delta.old_value, delta.new_value
                ));
            }
            md.push('\n');
        }
        if report.changed.len() > MAX_LISTED_KEYS {
            md.push_str(&format!(
                "... and {} more changed record(s)\n",
                report.changed.len() - MAX_LISTED_KEYS
            ));
        }
    }

    md
}

fn push_key_list<'a>(md: &mut String, title: &str, keys: impl ExactSizeIterator<Item = &'a str>) {
    let total = keys.len();
    if total == 0 {
        return;
    }
    md.push_str(&format!("\n## {} Keys\n\n", title));
    for key in keys.take(MAX_LISTED_KEYS) {
        md.push_str(&format!("- `{}`\n", key));
    }
    if total > MAX_LISTED_KEYS {
        md.push_str(&format!("- ... and {} more\n", total - MAX_LISTED_KEYS));
    }
}

/// Compact colored summary for the terminal.
pub fn format_diff_terminal(report: &DiffReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "═══════════════════════════════════════════".blue());
    let _ = writeln!(out, "{}", "             DATASET DIFF".bold().blue());
    let _ = writeln!(out, "{}", "═══════════════════════════════════════════".blue());

    if report.first_run {
        let _ = writeln!(out, "  {}", "first run: no previous snapshot".yellow());
    }
    let _ = writeln!(out, "  Added:      {}", report.summary.added.to_string().green());
    let _ = writeln!(out, "  Removed:    {}", report.summary.removed.to_string().red());
    let _ = writeln!(out, "  Changed:    {}", report.summary.changed.to_string().yellow());
    let _ = writeln!(out, "  Unchanged:  {}", report.summary.unchanged);

    if !report.schema_drift.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {}", "SCHEMA DRIFT".bold());
        for drift in &report.schema_drift {
            let kind = match drift.kind {
                DriftKind::AddedColumn => drift.kind.as_str().green(),
                DriftKind::RemovedColumn => drift.kind.as_str().red(),
                DriftKind::TypeMismatch => drift.kind.as_str().yellow(),
            };
            let _ = writeln!(out, "    {:<32} {}", drift.column, kind);
        }
    }

    let by_column = report.changes_by_column();
    if !by_column.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {} (top 10)", "CHANGED COLUMNS".bold());
        for (column, count) in by_column.iter().take(10) {
            let _ = writeln!(out, "    {:<32} {}", column, count);
        }
    }
    out
}
