use crate::cli::args::OutputFormat;
use crate::config::PipelineConfig;
use crate::pipeline::StageRegistry;
use crate::stages::build_registry;
use anyhow::Result;
use colored::*;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StagePlan {
    pub order: Vec<String>,
    /// Groups of stages with no dependencies between them
    pub levels: Vec<Vec<String>>,
}

pub fn plan(registry: &StageRegistry) -> crate::errors::Result<StagePlan> {
    let order = registry
        .resolve_order()?
        .iter()
        .map(|stage| stage.name().to_string())
        .collect();
    let levels = registry.execution_levels()?;
    Ok(StagePlan { order, levels })
}

pub fn handle_order(config: &PipelineConfig, format: OutputFormat) -> Result<StagePlan> {
    let registry = build_registry(&config.stages)?;
    let plan = plan(&registry)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Markdown => println!("{}", format_plan_markdown(&plan, &registry)),
        OutputFormat::Terminal => print!("{}", format_plan_terminal(&plan, &registry)),
    }
    Ok(plan)
}

fn format_plan_markdown(plan: &StagePlan, registry: &StageRegistry) -> String {
    let mut md = String::new();
    md.push_str("# Stage Order\n\n");
    if plan.order.is_empty() {
        md.push_str("No stages configured.\n");
        return md;
    }
    for (i, name) in plan.order.iter().enumerate() {
        let after = registry
            .get(name)
            .map(|s| s.dependencies().join(", "))
            .unwrap_or_default();
        if after.is_empty() {
            md.push_str(&format!("{}. `{}`\n", i + 1, name));
        } else {
            md.push_str(&format!("{}. `{}` (after {})\n", i + 1, name, after));
        }
    }
    md.push_str("\n## Levels\n\n");
    for (i, level) in plan.levels.iter().enumerate() {
        md.push_str(&format!("- Level {}: {}\n", i, level.join(", ")));
    }
    md
}

fn format_plan_terminal(plan: &StagePlan, registry: &StageRegistry) -> String {
    let mut out = String::new();
    if plan.order.is_empty() {
        out.push_str("No stages configured.\n");
        return out;
    }
    out.push_str(&format!("{}\n", "STAGE ORDER".bold()));
    for (i, name) in plan.order.iter().enumerate() {
        let stage = registry.get(name);
        let description = stage.and_then(|s| s.description()).unwrap_or("");
        out.push_str(&format!(
            "  {:>2}. {:<24} {}\n",
            i + 1,
            name.cyan(),
            description.dimmed()
        ));
    }
    out.push_str(&format!("\n{}\n", "LEVELS".bold()));
    for (i, level) in plan.levels.iter().enumerate() {
        out.push_str(&format!("  {:>2}: {}\n", i, level.join(", ")));
    }
    out
}
