use super::{DatasetProfile, FailureReport, ReportError, Reporter};
use crate::dataset::value::format_number;
use crate::diff::{format_diff_terminal, DiffReport};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

/// Prints reports to the terminal: profiles as tables, diffs as a colored
/// summary, failures to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

/// Render a profile as a table, one row per column.
pub fn profile_table(profile: &DatasetProfile) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "column", "type", "non-null", "nulls", "distinct", "min", "max", "mean",
        ]);

    let number = |n: Option<f64>| n.map(format_number).unwrap_or_default();
    for column in &profile.columns {
        table.add_row(vec![
            column.name.clone(),
            column
                .column_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
            column.non_null.to_string(),
            column.nulls.to_string(),
            column.distinct.map(|d| d.to_string()).unwrap_or_default(),
            number(column.min),
            number(column.max),
            column.mean.map(|m| format!("{:.2}", m)).unwrap_or_default(),
        ]);
    }
    table
}

impl Reporter for ConsoleReporter {
    fn profile(&self, profile: &DatasetProfile) -> Result<(), ReportError> {
        println!(
            "{} {} ({} rows)",
            "Profile:".bold(),
            profile.name.cyan(),
            profile.rows
        );
        println!("{}", profile_table(profile));
        Ok(())
    }

    fn diff(&self, report: &DiffReport) -> Result<(), ReportError> {
        println!("{}", format_diff_terminal(report));
        Ok(())
    }

    fn failure(&self, failure: &FailureReport) -> Result<(), ReportError> {
        eprintln!(
            "{} [{}] {}: {}",
            "error:".red().bold(),
            failure.code,
            failure.kind,
            failure.message
        );
        if let Some(phase) = failure.phase {
            eprintln!("  phase: {}", phase);
        }
        if let Some(stage) = &failure.stage {
            eprintln!("  stage: {}", stage);
        }
        for cause in failure.chain.iter().skip(1) {
            eprintln!("  {} {}", "caused by:".dimmed(), cause);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{record, Dataset, Value};

    #[test]
    fn test_profile_table_has_row_per_column() {
        let mut ds = Dataset::new("opa_id").with_records(vec![record([
            ("opa_id", Value::from("1")),
            ("market_value", Value::from(250000.0)),
        ])]);
        ds.infer_schema();

        let rendered = profile_table(&DatasetProfile::from_dataset("props", &ds)).to_string();
        assert!(rendered.contains("market_value"));
        assert!(rendered.contains("250000"));
        assert!(rendered.contains("opa_id"));
    }
}
