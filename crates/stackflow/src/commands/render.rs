use crate::utils;
use colored::Colorize;
use std::path::Path;

pub fn handle(start: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let loaded = utils::load(start)?;
    utils::build_graph(&loaded.stack)?;
    let program = stackflow_core::render_program(&loaded.stack)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &program)?;
            eprintln!(
                "{} {}",
                "✓ Wrote program to".green(),
                path.display().to_string().cyan()
            );
        }
        None => print!("{}", program),
    }

    Ok(())
}
