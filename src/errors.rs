//! Error taxonomy for pipeline runs.
//!
//! Every fatal condition of a run is a [`PipelineError`]. Registry and
//! ordering errors surface before any work begins; stage, finalization,
//! source, snapshot, publication, and reporting errors end the run. Schema
//! drift found while diffing is never an error and is reported inside the
//! diff instead.
//!
//! Each variant carries a stable [`ErrorCode`] and a `kind()` name that the
//! failure sink records alongside the message and cause chain.
//!
//! # Error Codes
//!
//! - E001-E009: registry and ordering errors
//! - E010-E019: stage execution errors
//! - E020-E029: finalization errors
//! - E030-E039: dataset input errors (source, snapshot)
//! - E040-E049: publication errors
//! - E050-E059: configuration errors
//! - E060-E069: reporting errors

use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::pipeline::FinalizationError;
use crate::publish::PublishError;
use crate::report::ReportError;
use serde::Serialize;
use std::error::Error as StdError;
use thiserror::Error;

/// Structured error code for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    /// Two stages registered under one name
    pub const DUPLICATE_STAGE: ErrorCode = ErrorCode("E001");
    /// Dependency names a stage that was never registered
    pub const UNKNOWN_DEPENDENCY: ErrorCode = ErrorCode("E002");
    /// Dependency graph has a cycle
    pub const CYCLIC_DEPENDENCY: ErrorCode = ErrorCode("E003");
    /// Stage scheduled before one of its dependencies ran
    pub const DEPENDENCY_NOT_SATISFIED: ErrorCode = ErrorCode("E004");

    pub const STAGE_FAILURE: ErrorCode = ErrorCode("E010");

    pub const FINALIZATION: ErrorCode = ErrorCode("E020");

    pub const SOURCE: ErrorCode = ErrorCode("E030");
    pub const SNAPSHOT: ErrorCode = ErrorCode("E031");
    pub const DATASET: ErrorCode = ErrorCode("E039");

    pub const PUBLISH: ErrorCode = ErrorCode("E040");

    pub const CONFIG: ErrorCode = ErrorCode("E050");

    pub const REPORT: ErrorCode = ErrorCode("E060");

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque cause of a failed stage.
pub type StageCause = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage '{0}' is already registered")]
    DuplicateStage(String),

    #[error("stage '{stage}' depends on unregistered stage '{dependency}'")]
    UnknownDependency { stage: String, dependency: String },

    #[error("dependency cycle between stages: {}", stages.join(" -> "))]
    CyclicDependency { stages: Vec<String> },

    #[error("stage '{stage}' cannot run before {}", missing.join(", "))]
    DependencyNotSatisfied { stage: String, missing: Vec<String> },

    #[error("stage '{stage_name}' failed")]
    StageFailure {
        stage_name: String,
        #[source]
        cause: StageCause,
    },

    #[error(transparent)]
    Finalization(#[from] FinalizationError),

    #[error("failed to load source dataset")]
    Source(#[source] DatasetError),

    #[error("failed to load previous snapshot")]
    Snapshot(#[source] DatasetError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to deliver report")]
    Report(#[from] ReportError),
}

impl PipelineError {
    pub fn stage_failure(stage_name: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::StageFailure {
            stage_name: stage_name.into(),
            cause: cause.into(),
        }
    }

    /// Stable error kind name recorded by the failure sink.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateStage(_) => "DuplicateStageError",
            Self::UnknownDependency { .. } => "UnknownDependencyError",
            Self::CyclicDependency { .. } => "CyclicDependencyError",
            Self::DependencyNotSatisfied { .. } => "DependencyNotSatisfiedError",
            Self::StageFailure { .. } => "StageFailure",
            Self::Finalization(_) => "FinalizationError",
            Self::Source(_) => "SourceError",
            Self::Snapshot(_) => "SnapshotError",
            Self::Dataset(_) => "DatasetError",
            Self::Publish(_) => "PublishError",
            Self::Config(_) => "ConfigError",
            Self::Report(_) => "ReportError",
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateStage(_) => ErrorCode::DUPLICATE_STAGE,
            Self::UnknownDependency { .. } => ErrorCode::UNKNOWN_DEPENDENCY,
            Self::CyclicDependency { .. } => ErrorCode::CYCLIC_DEPENDENCY,
            Self::DependencyNotSatisfied { .. } => ErrorCode::DEPENDENCY_NOT_SATISFIED,
            Self::StageFailure { .. } => ErrorCode::STAGE_FAILURE,
            Self::Finalization(_) => ErrorCode::FINALIZATION,
            Self::Source(_) => ErrorCode::SOURCE,
            Self::Snapshot(_) => ErrorCode::SNAPSHOT,
            Self::Dataset(_) => ErrorCode::DATASET,
            Self::Publish(_) => ErrorCode::PUBLISH,
            Self::Config(_) => ErrorCode::CONFIG,
            Self::Report(_) => ErrorCode::REPORT,
        }
    }

    /// Name of the failing stage, for stage-scoped errors.
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            Self::StageFailure { stage_name, .. } => Some(stage_name),
            Self::DependencyNotSatisfied { stage, .. }
            | Self::UnknownDependency { stage, .. } => Some(stage),
            Self::DuplicateStage(name) => Some(name),
            _ => None,
        }
    }

    /// True for errors raised while building the execution order.
    pub fn is_ordering_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateStage(_)
                | Self::UnknownDependency { .. }
                | Self::CyclicDependency { .. }
                | Self::DependencyNotSatisfied { .. }
        )
    }
}

/// Messages of every error in the `source()` chain, outermost first.
pub fn error_chain(error: &(dyn StdError + 'static)) -> Vec<String> {
    let mut chain = vec![error.to_string()];
    let mut current = error.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}

pub type Result<T> = std::result::Result<T, PipelineError>;
