//! Progress sink implementations.
//!
//! | Use case | Sink |
//! |----------|------|
//! | Unit tests | [`SilentProgressSink`] or [`RecordingProgressSink`] |
//! | Non-interactive runs, CI | [`LogProgressSink`] |
//! | Interactive terminal | [`BarProgressSink`] |
//!
//! # Example
//!
//! ```rust
//! use propflow::progress::implementations::{ProgressEvent, RecordingProgressSink};
//! use propflow::progress::traits::ProgressSink;
//!
//! let recorder = RecordingProgressSink::new();
//! recorder.start_stage("vacant");
//! recorder.complete_stage("vacant");
//!
//! assert_eq!(recorder.stages(), vec!["vacant"]);
//! assert!(matches!(recorder.events()[1], ProgressEvent::CompleteStage { .. }));
//! ```

use super::traits::ProgressSink;
use super::{ProgressManager, TEMPLATE_STAGES};
use indicatif::ProgressBar;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentProgressSink;

impl ProgressSink for SilentProgressSink {
    #[inline]
    fn start_stage(&self, _name: &str) {}

    #[inline]
    fn complete_stage(&self, _name: &str) {}

    #[inline]
    fn warn(&self, _message: &str) {}
}

/// Writes one log line per event through the `log` facade:
///
/// ```text
/// Pipeline: 4 stages
/// Stage 1/4: opa_properties
/// Stage 1/4 complete: opa_properties
/// ```
#[derive(Debug, Default)]
pub struct LogProgressSink {
    total: AtomicUsize,
    started: AtomicUsize,
}

impl LogProgressSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for LogProgressSink {
    fn begin_run(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.started.store(0, Ordering::Relaxed);
        log::info!("Pipeline: {} stages", total);
    }

    fn start_stage(&self, name: &str) {
        let index = self.started.fetch_add(1, Ordering::Relaxed) + 1;
        log::info!(
            "Stage {}/{}: {}",
            index,
            self.total.load(Ordering::Relaxed),
            name
        );
    }

    fn complete_stage(&self, name: &str) {
        log::info!(
            "Stage {}/{} complete: {}",
            self.started.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
            name
        );
    }

    fn fail_stage(&self, name: &str) {
        log::error!("Stage failed: {}", name);
    }

    fn warn(&self, message: &str) {
        log::warn!("{}", message);
    }

    fn finish_run(&self) {
        log::info!("Pipeline complete");
    }
}

/// Drives an indicatif bar: one tick per completed stage, the running stage
/// as the bar message. The bar is hidden when progress display is disabled.
#[derive(Debug, Clone)]
pub struct BarProgressSink {
    bar: ProgressBar,
}

impl BarProgressSink {
    pub fn new(manager: &ProgressManager) -> Self {
        Self {
            bar: manager.create_bar(0, TEMPLATE_STAGES),
        }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl ProgressSink for BarProgressSink {
    fn begin_run(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn start_stage(&self, name: &str) {
        self.bar.set_message(name.to_string());
        log::debug!("Applying stage {}", name);
    }

    fn complete_stage(&self, _name: &str) {
        self.bar.inc(1);
    }

    fn fail_stage(&self, name: &str) {
        self.bar.abandon_with_message(format!("{} failed", name));
    }

    fn warn(&self, message: &str) {
        self.bar.suspend(|| log::warn!("{}", message));
    }

    fn finish_run(&self) {
        self.bar.finish_with_message("stages complete");
    }
}

/// Event captured by [`RecordingProgressSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    BeginRun { total: usize },
    StartStage { name: String },
    CompleteStage { name: String },
    FailStage { name: String },
    Warn { message: String },
    FinishRun,
}

/// Records events in memory for assertions. Clones share one event log.
#[derive(Clone, Debug, Default)]
pub struct RecordingProgressSink {
    events: std::sync::Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ProgressEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.lock().clone()
    }

    /// Names of started stages, in order.
    pub fn stages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::StartStage { name } => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn completed_stages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::CompleteStage { name } => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Warn { message } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingProgressSink {
    fn begin_run(&self, total: usize) {
        self.lock().push(ProgressEvent::BeginRun { total });
    }

    fn start_stage(&self, name: &str) {
        self.lock().push(ProgressEvent::StartStage {
            name: name.to_string(),
        });
    }

    fn complete_stage(&self, name: &str) {
        self.lock().push(ProgressEvent::CompleteStage {
            name: name.to_string(),
        });
    }

    fn fail_stage(&self, name: &str) {
        self.lock().push(ProgressEvent::FailStage {
            name: name.to_string(),
        });
    }

    fn warn(&self, message: &str) {
        self.lock().push(ProgressEvent::Warn {
            message: message.to_string(),
        });
    }

    fn finish_run(&self) {
        self.lock().push(ProgressEvent::FinishRun);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressConfig;

    #[test]
    fn test_silent_sink_is_no_op() {
        let sink = SilentProgressSink;
        sink.begin_run(2);
        sink.start_stage("vacant");
        sink.complete_stage("vacant");
        sink.fail_stage("vacant");
        sink.warn("ignored");
        sink.finish_run();
    }

    #[test]
    fn test_recording_sink_records_in_order() {
        let recorder = RecordingProgressSink::new();
        recorder.begin_run(1);
        recorder.start_stage("vacant");
        recorder.warn("3 rows lack geometry");
        recorder.complete_stage("vacant");
        recorder.finish_run();

        assert_eq!(
            recorder.events(),
            vec![
                ProgressEvent::BeginRun { total: 1 },
                ProgressEvent::StartStage {
                    name: "vacant".into()
                },
                ProgressEvent::Warn {
                    message: "3 rows lack geometry".into()
                },
                ProgressEvent::CompleteStage {
                    name: "vacant".into()
                },
                ProgressEvent::FinishRun,
            ]
        );
        assert_eq!(recorder.warnings(), vec!["3 rows lack geometry"]);
    }

    #[test]
    fn test_recording_sink_clones_share_events() {
        let recorder = RecordingProgressSink::new();
        let cloned = recorder.clone();
        cloned.start_stage("a");
        recorder.complete_stage("a");
        assert_eq!(recorder.stages(), vec!["a"]);
        assert_eq!(cloned.completed_stages(), vec!["a"]);
    }

    #[test]
    fn test_log_sink_counts_started_stages() {
        let sink = LogProgressSink::new();
        sink.begin_run(3);
        sink.start_stage("a");
        sink.start_stage("b");
        assert_eq!(sink.started.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_bar_sink_is_hidden_in_quiet_mode() {
        let manager = ProgressManager::new(ProgressConfig {
            quiet_mode: true,
            verbosity: 0,
        });
        let sink = BarProgressSink::new(&manager);
        sink.begin_run(2);
        sink.start_stage("a");
        sink.complete_stage("a");
        assert!(sink.bar().is_hidden());
    }
}
