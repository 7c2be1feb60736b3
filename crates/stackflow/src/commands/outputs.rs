use crate::utils::{self, EngineOptions};
use colored::Colorize;
use stackflow_cloud::{ProvisioningEngine, StackOutputs};
use std::path::Path;

pub async fn handle(start: &Path, options: &EngineOptions, check: bool) -> anyhow::Result<()> {
    let loaded = utils::load(start)?;
    let program = utils::build_program(&loaded.stack, &options.stack)?;
    let engine = utils::engine(&loaded.project_root, options);

    let outputs = match engine.outputs(&program).await {
        Ok(outputs) => outputs,
        Err(e) => utils::fail("Failed to read outputs", e),
    };
    print_outputs(&outputs);

    if check {
        if let Err(e) = outputs.check(&program.declared_outputs) {
            utils::fail("Output check failed", e);
        }
        println!("{}", "✓ All declared outputs are set".green());
    }
    Ok(())
}

pub fn print_outputs(outputs: &StackOutputs) {
    println!();
    if outputs.is_empty() {
        println!("{}", "No outputs".dimmed());
        return;
    }

    println!("{}", "Outputs:".bold());
    for (name, value) in outputs.iter() {
        let value = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        println!("  {}: {}", name.cyan(), value);
    }
}
