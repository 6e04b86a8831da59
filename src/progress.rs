//! Stage progress feedback.
//!
//! The runner reports through a [`traits::ProgressSink`]. On an interactive
//! terminal the CLI uses an indicatif bar; otherwise, and whenever quiet mode
//! is on, progress goes to the log instead.
//!
//! # Progress Behavior
//!
//! - **Quiet Mode**: no bar (`PROPFLOW_QUIET` env var or `--quiet`)
//! - **Non-TTY**: no bar in CI and piped output
//!
//! ```rust,no_run
//! use propflow::progress::traits::ProgressSink;
//! use propflow::progress::{ProgressConfig, ProgressManager};
//!
//! let manager = ProgressManager::new(ProgressConfig::from_env(false, 0));
//! let sink = manager.stage_sink();
//! sink.begin_run(3);
//! ```

pub mod implementations;
pub mod traits;

use implementations::{BarProgressSink, LogProgressSink};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use traits::ProgressSink;

pub const TEMPLATE_STAGES: &str = "{spinner} [{bar:30}] {pos}/{len} stages - {msg} ({elapsed})";

/// Environment variable that silences progress bars when set.
pub const QUIET_ENV: &str = "PROPFLOW_QUIET";

#[derive(Debug, Clone, Default)]
pub struct ProgressConfig {
    /// Suppress progress bars
    pub quiet_mode: bool,
    /// Verbosity level (0 = basic, 1 = detailed, 2 = very detailed)
    pub verbosity: u8,
}

impl ProgressConfig {
    /// Combine CLI flags with the environment.
    pub fn from_env(quiet: bool, verbosity: u8) -> Self {
        let env_quiet = std::env::var(QUIET_ENV).is_ok();
        Self {
            quiet_mode: quiet || env_quiet,
            verbosity,
        }
    }

    pub fn should_show_progress(&self) -> bool {
        if self.quiet_mode {
            return false;
        }
        use std::io::IsTerminal;
        std::io::stderr().is_terminal()
    }
}

/// Creates progress bars that share one terminal area.
#[derive(Clone)]
pub struct ProgressManager {
    multi: Arc<MultiProgress>,
    config: ProgressConfig,
}

impl ProgressManager {
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            multi: Arc::new(MultiProgress::new()),
            config,
        }
    }

    /// A bar with the given length and template, hidden when progress
    /// should not be shown.
    pub fn create_bar(&self, len: u64, template: &str) -> ProgressBar {
        if !self.config.should_show_progress() {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(style);
        pb
    }

    /// The sink the runner should report to: a bar on an interactive
    /// terminal, log lines otherwise.
    pub fn stage_sink(&self) -> Arc<dyn ProgressSink> {
        if self.config.should_show_progress() {
            Arc::new(BarProgressSink::new(self))
        } else {
            Arc::new(LogProgressSink::new())
        }
    }

    pub fn verbosity(&self) -> u8 {
        self.config.verbosity
    }

    /// Clear all bars before printing final output.
    pub fn clear(&self) -> std::io::Result<()> {
        self.multi.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_quiet_flag() {
        let config = ProgressConfig::from_env(true, 0);
        assert!(!config.should_show_progress());
    }

    #[test]
    fn test_verbosity_is_kept() {
        assert_eq!(ProgressConfig::from_env(false, 2).verbosity, 2);
    }

    #[test]
    fn test_quiet_manager_hides_bars() {
        let manager = ProgressManager::new(ProgressConfig {
            quiet_mode: true,
            verbosity: 0,
        });
        assert!(manager.create_bar(10, TEMPLATE_STAGES).is_hidden());
    }
}
