//! Declarative stages configured in `.propflow.toml`.
//!
//! These are generic column operations; they carry no knowledge of what the
//! columns mean. Real enrichment stages implement [`Stage`](crate::pipeline::Stage)
//! directly and are registered alongside these.
//!
//! ```toml
//! [[stages]]
//! name = "vacant"
//! op = "flag"
//! column = "vacant"
//! when = { column = "land_use", op = "eq", value = "vacant" }
//!
//! [[stages]]
//! name = "clean_price"
//! after = ["vacant"]
//! op = "fill_null"
//! column = "sale_price"
//! value = 0
//! ```

pub mod ops;
pub mod predicate;

pub use ops::DeclarativeStage;
pub use predicate::{Predicate, PredicateOp};

use crate::config::ConfigError;
use crate::dataset::Value;
use crate::errors::Result;
use crate::pipeline::StageRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `[[stages]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,

    /// Stages that must run first
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub op: StageOp,
}

/// Column operation applied by a declarative stage (tagged by `op`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StageOp {
    /// Set a boolean column from a predicate
    Flag { column: String, when: Predicate },

    /// Replace nulls (and missing cells) in a column
    FillNull { column: String, value: Value },

    /// Rename columns according to mapping
    Rename { mapping: BTreeMap<String, String> },

    /// Drop specified columns
    DropColumns { columns: Vec<String> },

    /// Keep only rows matching the predicate
    Filter { when: Predicate },
}

impl StageOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flag { .. } => "flag",
            Self::FillNull { .. } => "fill_null",
            Self::Rename { .. } => "rename",
            Self::DropColumns { .. } => "drop_columns",
            Self::Filter { .. } => "filter",
        }
    }

    /// Checks that need no data: comparison predicates carry a value, and
    /// the op names at least one column.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::Flag { column, when } => {
                non_empty("column", column)?;
                when.validate()
            }
            Self::FillNull { column, value } => {
                non_empty("column", column)?;
                if value.is_null() {
                    return Err("fill value must not be null".to_string());
                }
                Ok(())
            }
            Self::Rename { mapping } => {
                if mapping.is_empty() {
                    return Err("rename mapping is empty".to_string());
                }
                let mut targets = std::collections::HashSet::new();
                mapping.iter().try_for_each(|(from, to)| {
                    non_empty("rename source", from)?;
                    non_empty("rename target", to)?;
                    if !targets.insert(to.as_str()) {
                        return Err(format!("more than one column renamed to '{}'", to));
                    }
                    Ok(())
                })
            }
            Self::DropColumns { columns } => {
                if columns.is_empty() {
                    return Err("no columns to drop".to_string());
                }
                columns.iter().try_for_each(|c| non_empty("column", c))
            }
            Self::Filter { when } => when.validate(),
        }
    }
}

fn non_empty(what: &str, value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", what))
    } else {
        Ok(())
    }
}

/// Register every spec, in order, into a new registry.
pub fn build_registry(specs: &[StageSpec]) -> Result<StageRegistry> {
    let mut registry = StageRegistry::new();
    register_specs(&mut registry, specs)?;
    Ok(registry)
}

/// Register specs into an existing registry, after any stages already in it.
pub fn register_specs(registry: &mut StageRegistry, specs: &[StageSpec]) -> Result<()> {
    for spec in specs {
        spec.op.validate().map_err(|reason| ConfigError::InvalidStage {
            stage: spec.name.clone(),
            reason,
        })?;
        registry.register(DeclarativeStage::from_spec(spec.clone()))?;
    }
    log::debug!("Registered {} declarative stages", specs.len());
    Ok(())
}
