//! Panic hook that prints a crash report with the run context.
//!
//! The report names the run phase, the stage being applied, and how many
//! stages had completed, so a panic inside a stage points at that stage.

use super::context::{get_current_context, get_stage_progress, RunContext};
use std::fmt::Write as _;
use std::panic::PanicHookInfo;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const RULE: &str = "--------------------------------------------------------------------------------";

/// Install the crash report hook. Call once, early in `main`.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let message = extract_panic_message(info);
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
        let report = render_crash_report(
            &message,
            location.as_deref(),
            &get_current_context(),
            get_stage_progress(),
        );
        eprintln!("{}", report);
        print_backtrace_hint();
    }));
}

fn render_crash_report(
    message: &str,
    location: Option<&str>,
    context: &RunContext,
    (completed, total): (usize, usize),
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "propflow crash report");
    let _ = writeln!(out, "  version:  {}", VERSION);
    let _ = writeln!(out, "  platform: {}", std::env::consts::OS);
    let _ = writeln!(
        out,
        "  time:     {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "  panic:    {}", truncate(message, 68));
    if let Some(location) = location {
        let _ = writeln!(out, "  location: {}", location);
    }
    match context.phase {
        Some(phase) => {
            let _ = writeln!(out, "  phase:    {}", phase);
        }
        None => {
            let _ = writeln!(out, "  phase:    (not set, crash before the run started)");
        }
    }
    if let Some(stage) = &context.stage {
        let _ = writeln!(out, "  stage:    {}", stage);
    }
    if let Some(span) = tracing::Span::current().metadata() {
        let _ = writeln!(out, "  span:     {}", span.name());
    }
    if total > 0 {
        let _ = writeln!(out, "  progress: {} / {} stages completed", completed, total);
    }
    let _ = write!(out, "{}", RULE);
    out
}

fn print_backtrace_hint() {
    if std::env::var("RUST_BACKTRACE").is_ok() {
        eprintln!("{}", std::backtrace::Backtrace::capture());
    } else {
        eprintln!("Run with RUST_BACKTRACE=1 for a stack trace");
    }
}

fn extract_panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::RunPhase;

    #[test]
    fn test_report_names_phase_and_stage() {
        let context = RunContext {
            phase: Some(RunPhase::Stages),
            stage: Some("tree_canopy".to_string()),
        };
        let report = render_crash_report("index out of bounds", Some("src/x.rs:1:2"), &context, (3, 8));

        assert!(report.contains("panic:    index out of bounds"));
        assert!(report.contains("phase:    stages"));
        assert!(report.contains("stage:    tree_canopy"));
        assert!(report.contains("3 / 8 stages completed"));
    }

    #[test]
    fn test_report_without_context() {
        let report = render_crash_report("boom", None, &RunContext::new(), (0, 0));
        assert!(report.contains("not set"));
        assert!(!report.contains("stage:"));
        assert!(!report.contains("progress:"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }
}
