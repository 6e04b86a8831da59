//! propflow: a property dataset ETL pipeline.
//!
//! A base dataset is threaded through dependency-ordered stages, finalized
//! (deduplicated by identity key, columns coerced), diffed against the
//! previously published snapshot, and handed to publishers and reporters.

// Export modules for library usage
pub mod cli;
pub mod config;
pub mod dataset;
pub mod diff;
pub mod errors;
pub mod job;
pub mod observability;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod report;
pub mod stages;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::dataset::{Dataset, Record, RecordKey, Value};
pub use crate::diff::{DiffEngine, DiffReport};
pub use crate::errors::{PipelineError, Result};
pub use crate::job::{EtlJob, JobSummary};
pub use crate::pipeline::{PipelineRunner, Stage, StageRegistry};
