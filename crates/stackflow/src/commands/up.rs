use super::preview::print_plan;
use crate::utils::{self, EngineOptions};
use colored::Colorize;
use stackflow_cloud::ProvisioningEngine;
use std::path::Path;

pub async fn handle(start: &Path, options: &EngineOptions, yes: bool) -> anyhow::Result<()> {
    let loaded = utils::load(start)?;
    utils::build_graph(&loaded.stack)?;
    let program = utils::build_program(&loaded.stack, &options.stack)?;
    let engine = utils::engine(&loaded.project_root, options);
    utils::ensure_auth(&engine).await;

    println!(
        "{} {} ({})",
        "Deploying".blue(),
        program.project.cyan(),
        program.stack
    );

    let plan = match engine.preview(&program).await {
        Ok(plan) => plan,
        Err(e) => utils::fail("Preview failed", e),
    };
    print_plan(&plan);

    if !plan.has_changes {
        return Ok(());
    }

    if !yes && !utils::confirm("Apply these changes?")? {
        println!("{}", "Cancelled".yellow());
        return Ok(());
    }

    let result = match engine.apply(&program, &plan).await {
        Ok(result) => result,
        Err(e) => utils::fail("Deployment failed", e),
    };
    println!();
    println!(
        "{} ({:.1}s)",
        "✓ Deployment complete".green().bold(),
        result.duration_ms() as f64 / 1000.0
    );

    match engine.outputs(&program).await {
        Ok(outputs) => super::outputs::print_outputs(&outputs),
        Err(e) => eprintln!("{} could not read outputs: {}", "⚠".yellow(), e),
    }
    Ok(())
}
