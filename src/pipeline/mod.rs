//! Dependency-ordered stage execution.
//!
//! - [`StageRegistry`] holds the registered stages and resolves their order.
//! - [`PipelineRunner`] applies stages in that order, then finalizes.
//! - [`Finalizer`] deduplicates by identity key and coerces column types.
//!
//! ```rust
//! use propflow::dataset::{record, Dataset, Value};
//! use propflow::pipeline::{FinalizationConfig, Finalizer, FnStage, PipelineRunner, StageRegistry};
//! use propflow::progress::implementations::SilentProgressSink;
//! use std::sync::Arc;
//!
//! let mut registry = StageRegistry::new();
//! registry
//!     .register(FnStage::new("priority", |ds: Dataset| Ok(ds)).after(["vacant"]))
//!     .unwrap();
//! registry.register(FnStage::new("vacant", |ds: Dataset| Ok(ds))).unwrap();
//!
//! let order = registry.resolve_order().unwrap();
//! let runner = PipelineRunner::new(
//!     Arc::new(SilentProgressSink),
//!     Finalizer::new(FinalizationConfig::dedup_only()),
//! );
//! let base = Dataset::new("opa_id").with_records(vec![record([("opa_id", Value::from("1"))])]);
//! let outcome = runner.run(base, &order).unwrap();
//! assert_eq!(outcome.timings[0].name, "vacant");
//! ```

pub mod finalize;
pub mod registry;
pub mod runner;
pub mod stage;

pub use finalize::{
    dedup_by_key, FinalizationConfig, FinalizationError, FinalizationReport, Finalizer,
    FINALIZE_STAGE,
};
pub use registry::StageRegistry;
pub use runner::{PipelineRunner, RunOutcome};
pub use stage::{FnStage, Stage, StageTiming};
