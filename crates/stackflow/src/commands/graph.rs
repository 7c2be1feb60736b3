use crate::utils;
use colored::Colorize;
use std::path::Path;

pub fn handle(start: &Path, json: bool) -> anyhow::Result<()> {
    let loaded = utils::load(start)?;
    let graph = utils::build_graph(&loaded.stack)?;
    let summary = graph.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", "Creation order:".bold());
    for (i, name) in summary.creation_order.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, name.cyan());
    }

    println!();
    println!("{}", "Layers:".bold());
    for (i, layer) in summary.layers.iter().enumerate() {
        println!("  {}: {}", i, layer.join(", "));
    }

    println!();
    println!("{}", "References:".bold());
    for edge in &summary.edges {
        println!("  {} -> {} ({})", edge.from.cyan(), edge.to, edge.field.dimmed());
    }

    Ok(())
}
