use crate::utils::{self, EngineOptions};
use colored::Colorize;
use stackflow_cloud::{ActionType, Plan, ProvisioningEngine};
use std::path::Path;

pub async fn handle(start: &Path, options: &EngineOptions) -> anyhow::Result<()> {
    let loaded = utils::load(start)?;
    utils::build_graph(&loaded.stack)?;
    let program = utils::build_program(&loaded.stack, &options.stack)?;

    let engine = utils::engine(&loaded.project_root, options);
    println!(
        "{} {} ({})",
        "Previewing".blue(),
        program.project.cyan(),
        program.stack
    );

    let plan = match engine.preview(&program).await {
        Ok(plan) => plan,
        Err(e) => utils::fail("Preview failed", e),
    };
    print_plan(&plan);
    Ok(())
}

/// Print the planned changes and their summary
pub fn print_plan(plan: &Plan) {
    println!();
    if !plan.has_changes {
        println!("{}", "✓ No changes".green());
        return;
    }

    for action in plan.changes() {
        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Update => "~".yellow(),
            ActionType::Replace => "±".magenta(),
            ActionType::Delete => "-".red(),
            ActionType::NoOp => " ".normal(),
        };
        println!(
            "  {} {} ({})",
            marker,
            action.resource_name.cyan(),
            action.resource_type
        );
    }
    println!();
    println!("{}", plan.summary().to_string().bold());
}
