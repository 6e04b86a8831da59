use super::{StageOp, StageSpec};
use crate::dataset::{ColumnType, Dataset, Value};
use crate::pipeline::Stage;
use anyhow::{bail, Result};

/// A [`Stage`] that applies one configured [`StageOp`].
#[derive(Debug, Clone)]
pub struct DeclarativeStage {
    name: String,
    dependencies: Vec<String>,
    description: Option<String>,
    op: StageOp,
}

impl DeclarativeStage {
    pub fn from_spec(spec: StageSpec) -> Self {
        Self {
            name: spec.name,
            dependencies: spec.after,
            description: spec.description,
            op: spec.op,
        }
    }

    pub fn op(&self) -> &StageOp {
        &self.op
    }
}

impl Stage for DeclarativeStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn apply(&self, mut dataset: Dataset) -> Result<Dataset> {
        match &self.op {
            StageOp::Flag { column, when } => {
                require_column(&dataset, &when.column)?;
                let mut flagged = 0usize;
                for record in &mut dataset.records {
                    let hit = when.matches(record);
                    flagged += usize::from(hit);
                    record.insert(column.clone(), Value::Bool(hit));
                }
                dataset.schema.insert(column.as_str(), ColumnType::Boolean);
                dataset.collect_metadata(&self.name, "flagged_count", flagged);
            }
            StageOp::FillNull { column, value } => {
                require_column(&dataset, column)?;
                let mut filled = 0usize;
                for record in &mut dataset.records {
                    let cell = record.entry(column.clone()).or_default();
                    if cell.is_null() {
                        *cell = value.clone();
                        filled += 1;
                    }
                }
                if let (None, Some(ty)) = (dataset.schema.get(column), value.natural_type()) {
                    dataset.schema.insert(column.as_str(), ty);
                }
                dataset.collect_metadata(&self.name, "filled_count", filled);
            }
            StageOp::Rename { mapping } => {
                for (from, to) in mapping {
                    require_column(&dataset, from)?;
                    if !mapping.contains_key(to) && has_column(&dataset, to) {
                        bail!("cannot rename '{}' to existing column '{}'", from, to);
                    }
                }
                // Lift every source out before placing any target.
                for record in &mut dataset.records {
                    let lifted: Vec<_> = mapping
                        .iter()
                        .filter_map(|(from, to)| record.remove(from).map(|v| (to.clone(), v)))
                        .collect();
                    record.extend(lifted);
                }
                let lifted: Vec<_> = mapping
                    .iter()
                    .filter_map(|(from, to)| dataset.schema.remove(from).map(|ty| (to, ty)))
                    .collect();
                for (to, ty) in lifted {
                    dataset.schema.insert(to.as_str(), ty);
                }
                if let Some(to) = mapping.get(&dataset.identity_key) {
                    log::info!(
                        "Identity column renamed from '{}' to '{}'",
                        dataset.identity_key,
                        to
                    );
                    dataset.identity_key = to.clone();
                }
            }
            StageOp::DropColumns { columns } => {
                if columns.contains(&dataset.identity_key) {
                    bail!("cannot drop identity column '{}'", dataset.identity_key);
                }
                for record in &mut dataset.records {
                    for column in columns {
                        record.remove(column);
                    }
                }
                for column in columns {
                    dataset.schema.remove(column);
                }
            }
            StageOp::Filter { when } => {
                require_column(&dataset, &when.column)?;
                let before = dataset.len();
                dataset.records.retain(|record| when.matches(record));
                let removed = before - dataset.len();
                log::debug!("Stage '{}' removed {} rows", self.name, removed);
                dataset.collect_metadata(&self.name, "rows_removed", removed);
            }
        }
        Ok(dataset)
    }
}

/// A column exists when it is declared or present in at least one record.
/// An empty dataset accepts any column.
fn require_column(dataset: &Dataset, column: &str) -> Result<()> {
    if !dataset.is_empty() && !has_column(dataset, column) {
        bail!("column '{}' not found", column);
    }
    Ok(())
}

fn has_column(dataset: &Dataset, column: &str) -> bool {
    dataset.schema.contains(column) || dataset.records.iter().any(|r| r.contains_key(column))
}
