use crate::utils;
use colored::Colorize;
use std::path::Path;

pub fn handle(start: &Path) -> anyhow::Result<()> {
    println!("{}", "Validating declaration...".blue());

    let loaded = match stackflow_core::load_or_builtin(start) {
        Ok(loaded) => loaded,
        Err(e) => utils::fail("Failed to load declaration", e),
    };
    utils::print_source(&loaded);

    let stack = &loaded.stack;
    let graph = match utils::build_graph(stack) {
        Ok(graph) => graph,
        Err(e) => utils::fail("Invalid declaration", e),
    };

    println!("{}", "✓ Declaration is valid".green().bold());
    println!();
    println!("Summary:");
    println!("  Project: {}", stack.name.cyan());
    if let Some(region) = &stack.region {
        println!("  Region: {}", region.cyan());
    }
    println!(
        "  Resources: {} ({} managed, {} lookups)",
        stack.resources.len(),
        stack.managed_resources().count(),
        stack.resources.len() - stack.managed_resources().count()
    );
    for resource in &stack.resources {
        println!(
            "    - {} ({})",
            resource.name.cyan(),
            resource.resource_type().engine_token()
        );
    }
    println!("  References: {}", graph.edge_count());
    println!("  Outputs: {}", stack.outputs.len());
    for output in &stack.outputs {
        println!(
            "    - {} = {}.{}",
            output.name.cyan(),
            output.resource,
            output.attribute
        );
    }

    Ok(())
}
