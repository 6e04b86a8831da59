//! The progress sink abstraction.
//!
//! The runner emits one start event before applying each stage and one
//! completion event after it, in execution order. Sinks decide how to show
//! them: log lines, a progress bar, nothing, or an in-memory record for tests.
//!
//! # Example
//!
//! ```rust
//! use propflow::progress::traits::ProgressSink;
//!
//! struct Stderr;
//!
//! impl ProgressSink for Stderr {
//!     fn begin_run(&self, total: usize) {
//!         eprintln!("{} stages", total);
//!     }
//!     fn start_stage(&self, name: &str) {
//!         eprintln!("start {}", name);
//!     }
//!     fn complete_stage(&self, name: &str) {
//!         eprintln!("done {}", name);
//!     }
//!     fn warn(&self, message: &str) {
//!         eprintln!("warning: {}", message);
//!     }
//! }
//! ```

/// Receives stage progress events.
///
/// Implementations must be cheap and must not panic; they may be shared
/// across threads.
pub trait ProgressSink: Send + Sync {
    /// Called once before the first stage with the number of stages.
    fn begin_run(&self, _total: usize) {}

    /// A stage is about to be applied.
    fn start_stage(&self, name: &str);

    /// A stage was applied successfully.
    fn complete_stage(&self, name: &str);

    /// A stage failed; no further stages will start.
    fn fail_stage(&self, name: &str) {
        self.warn(&format!("stage '{}' failed", name));
    }

    /// A non-fatal condition worth surfacing.
    fn warn(&self, message: &str);

    /// Called once after the last stage and finalization.
    fn finish_run(&self) {}
}
