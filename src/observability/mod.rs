//! Run context tracking and crash reports.
//!
//! The job marks each run phase and the runner marks each stage, so failure
//! reports and panics can say where a run stopped.
//!
//! ```ignore
//! use propflow::observability::{install_panic_hook, set_phase, RunPhase};
//!
//! install_panic_hook();
//! let _phase = set_phase(RunPhase::Diff);
//! ```

pub mod context;
pub mod panic_hook;

pub use context::{
    get_current_context, get_stage_progress, increment_stages_completed, reset_context,
    set_current_stage, set_phase, set_stage_progress, ContextGuard, RunContext, RunPhase,
};
pub use panic_hook::install_panic_hook;
