use colored::Colorize;
use stackflow_cloud::{Program, ProvisioningEngine};
use stackflow_cloud_pulumi::PulumiEngine;
use stackflow_core::{LoadedStack, ResourceGraph, Stack, StackSource};
use std::io::Write;
use std::path::Path;

/// Engine settings shared by preview/up/destroy/outputs
pub struct EngineOptions {
    pub stack: String,
    pub pulumi_bin: String,
}

/// Load the declaration and print where it came from
pub fn load(start: &Path) -> anyhow::Result<LoadedStack> {
    let loaded = stackflow_core::load_or_builtin(start)?;
    print_source(&loaded);
    Ok(loaded)
}

pub fn print_source(loaded: &LoadedStack) {
    match &loaded.source {
        StackSource::File(path) => {
            eprintln!("📄 {}", path.display().to_string().cyan());
        }
        StackSource::Builtin => {
            eprintln!(
                "📄 {} (no stack.kdl found)",
                loaded.source.to_string().cyan()
            );
        }
    }
}

/// Validate the graph and report references to later-declared resources
pub fn build_graph(stack: &Stack) -> anyhow::Result<ResourceGraph> {
    let graph = ResourceGraph::build(stack)?;
    for edge in graph.forward_references() {
        eprintln!(
            "{} {} references {} ({}) declared after it",
            "⚠".yellow(),
            edge.from.cyan(),
            edge.to.cyan(),
            edge.field
        );
    }
    Ok(graph)
}

/// Render the stack into the program handed to the engine
pub fn build_program(stack: &Stack, stack_name: &str) -> anyhow::Result<Program> {
    let manifest = stackflow_core::render_program(stack)?;
    let stack_config = stackflow_core::render_stack_config(stack)?;

    Ok(Program::new(&stack.name, stack_name, manifest)
        .with_stack_config(stack_config)
        .with_declared_outputs(stack.outputs.iter().map(|o| o.name.clone())))
}

pub fn engine(project_root: &Path, options: &EngineOptions) -> PulumiEngine {
    PulumiEngine::new(project_root).with_binary(&options.pulumi_bin)
}

/// Exit unless the engine is installed and logged in
pub async fn ensure_auth(engine: &impl ProvisioningEngine) {
    match engine.check_auth().await {
        Ok(status) if status.authenticated => {
            if let Some(user) = status.account_info {
                tracing::debug!(user = %user, "Engine authenticated");
            }
        }
        Ok(status) => fail(
            &format!("{} is not logged in", engine.display_name()),
            status.error.unwrap_or_default(),
        ),
        Err(e) => fail(&format!("{} is not available", engine.display_name()), e),
    }
}

/// Ask a yes/no question on the terminal
pub fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{} [y/N]: ", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Print a failure line and exit with status 1
pub fn fail(title: &str, detail: impl std::fmt::Display) -> ! {
    eprintln!();
    eprintln!("{}", format!("✗ {}", title).red().bold());
    eprintln!("  {}", detail);
    std::process::exit(1);
}
