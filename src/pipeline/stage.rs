//! The stage abstraction.
//!
//! A stage is one enrichment step: it takes ownership of the dataset, may add
//! or modify columns, filter rows, and append metadata, and hands the dataset
//! back. Stages declare the names of stages that must have run before them;
//! the registry turns those declarations into an execution order.

use crate::dataset::Dataset;

/// A named dataset transformation with declared predecessors.
///
/// Stages are registered once at process start and must not keep state
/// between runs.
pub trait Stage: Send + Sync {
    /// Unique stage name.
    fn name(&self) -> &str;

    /// Names of stages that must run before this one.
    fn dependencies(&self) -> &[String] {
        &[]
    }

    fn description(&self) -> Option<&str> {
        None
    }

    /// Apply the stage. Any error ends the run.
    fn apply(&self, dataset: Dataset) -> anyhow::Result<Dataset>;
}

/// A stage backed by a closure.
///
/// # Example
///
/// ```rust
/// use propflow::pipeline::{FnStage, Stage};
/// use propflow::dataset::{Dataset, Value};
///
/// let stage = FnStage::new("vacant", |mut ds: Dataset| {
///     for record in &mut ds.records {
///         record.insert("vacant".into(), Value::Bool(false));
///     }
///     Ok(ds)
/// })
/// .after(["opa_properties"]);
///
/// assert_eq!(stage.dependencies(), ["opa_properties".to_string()]);
/// ```
pub struct FnStage<F> {
    name: String,
    dependencies: Vec<String>,
    description: Option<String>,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(Dataset) -> anyhow::Result<Dataset> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            description: None,
            func,
        }
    }

    /// Declare predecessor stages.
    pub fn after<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(Dataset) -> anyhow::Result<Dataset> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn apply(&self, dataset: Dataset) -> anyhow::Result<Dataset> {
        (self.func)(dataset)
    }
}

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    pub name: String,
    pub duration: std::time::Duration,
}
