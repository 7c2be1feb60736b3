use colored::Colorize;
use stackflow_core::declaration::{BOOT_SCRIPT, BOOT_SCRIPT_FILE, STACK_KDL};
use std::path::Path;

pub fn handle(dir: &Path, force: bool) -> anyhow::Result<()> {
    let stack_file = dir.join(stackflow_core::STACK_FILE);
    let boot_script = dir.join(BOOT_SCRIPT_FILE);

    if !force {
        for path in [&stack_file, &boot_script] {
            if path.exists() {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
        }
    }

    std::fs::create_dir_all(dir)?;
    std::fs::write(&stack_file, STACK_KDL)?;
    std::fs::write(&boot_script, BOOT_SCRIPT)?;

    println!("{}", "✓ Created stack files".green());
    println!("  {}", stack_file.display().to_string().cyan());
    println!("  {}", boot_script.display().to_string().cyan());
    println!();
    println!("{}", "Next:".bold());
    println!("  {} validate", "stackflow".cyan());
    println!("  {} preview", "stackflow".cyan());
    Ok(())
}
