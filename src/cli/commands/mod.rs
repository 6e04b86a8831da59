pub mod diff;
pub mod init;
pub mod order;
pub mod run;

pub use diff::handle_diff;
pub use init::init_config;
pub use order::handle_order;
pub use run::handle_run;

use super::args::OutputFormat;
use crate::diff::{format_diff_markdown, format_diff_terminal, DiffReport};
use anyhow::{Context, Result};
use std::path::Path;

/// Render a diff report in the requested format.
pub fn render_diff(report: &DiffReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Markdown => format_diff_markdown(report),
        OutputFormat::Terminal => format_diff_terminal(report),
    })
}

/// Write to `output`, creating parent directories, or print to stdout.
pub fn emit(contents: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{}", contents),
    }
    Ok(())
}
