use crate::utils::{self, EngineOptions};
use colored::Colorize;
use stackflow_cloud::ProvisioningEngine;
use std::path::Path;

pub async fn handle(start: &Path, options: &EngineOptions, yes: bool) -> anyhow::Result<()> {
    let loaded = utils::load(start)?;
    let program = utils::build_program(&loaded.stack, &options.stack)?;
    let engine = utils::engine(&loaded.project_root, options);
    utils::ensure_auth(&engine).await;

    println!(
        "{} {} ({})",
        "Destroying".red(),
        program.project.cyan(),
        program.stack
    );
    println!("{}", "Every resource of this stack will be deleted.".yellow());

    if !yes && !utils::confirm("Destroy the stack?")? {
        println!("{}", "Cancelled".yellow());
        return Ok(());
    }

    let result = match engine.destroy(&program).await {
        Ok(result) => result,
        Err(e) => utils::fail("Destroy failed", e),
    };
    println!();
    println!(
        "{} ({:.1}s)",
        "✓ Stack destroyed".green().bold(),
        result.duration_ms() as f64 / 1000.0
    );
    Ok(())
}
