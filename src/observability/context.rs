//! Thread-local run context for failure and crash reports.
//!
//! Tracks which phase of a run is active and which stage is being applied,
//! so a failure report or a panic can say where the run was. Stage counters
//! are global atomics; the phase and stage are per thread.

use serde::Serialize;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

static STAGES_COMPLETED: AtomicUsize = AtomicUsize::new(0);
static STAGES_TOTAL: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_CONTEXT: RefCell<RunContext> = const { RefCell::new(RunContext::new()) };
}

/// Snapshot of what the run was doing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunContext {
    pub phase: Option<RunPhase>,
    pub stage: Option<String>,
}

impl RunContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            stage: None,
        }
    }
}

/// Major phases of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Resolving the stage execution order
    Ordering,
    /// Loading the base dataset
    Loading,
    /// Applying stages
    Stages,
    Finalization,
    MetadataExport,
    Profiling,
    /// Loading the previous snapshot and diffing
    Diff,
    Publication,
    Reporting,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ordering => "ordering",
            Self::Loading => "loading",
            Self::Stages => "stages",
            Self::Finalization => "finalization",
            Self::MetadataExport => "metadata_export",
            Self::Profiling => "profiling",
            Self::Diff => "diff",
            Self::Publication => "publication",
            Self::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// Restores the previous context on drop.
pub struct ContextGuard {
    previous: RunContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

/// Enter a run phase until the returned guard drops.
#[must_use]
pub fn set_phase(phase: RunPhase) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().phase = Some(phase);
        ContextGuard { previous }
    })
}

/// Mark a stage as being applied until the returned guard drops.
#[must_use]
pub fn set_current_stage(name: impl Into<String>) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        ctx.borrow_mut().stage = Some(name.into());
        ContextGuard { previous }
    })
}

#[must_use]
pub fn get_current_context() -> RunContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

pub fn set_stage_progress(completed: usize, total: usize) {
    STAGES_COMPLETED.store(completed, Ordering::Relaxed);
    STAGES_TOTAL.store(total, Ordering::Relaxed);
}

pub fn increment_stages_completed() {
    STAGES_COMPLETED.fetch_add(1, Ordering::Relaxed);
}

/// `(completed, total)` stage counts.
#[must_use]
pub fn get_stage_progress() -> (usize, usize) {
    (
        STAGES_COMPLETED.load(Ordering::Relaxed),
        STAGES_TOTAL.load(Ordering::Relaxed),
    )
}

pub fn reset_context() {
    CURRENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = RunContext::new();
    });
}
