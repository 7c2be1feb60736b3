mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackflow")]
#[command(
    about = "Declare a minimal AWS web stack and provision it through Pulumi",
    long_about = None
)]
struct Cli {
    /// Directory to search for stack.kdl (walks up to parent directories)
    #[arg(long, global = true, env = "STACKFLOW_PROJECT_ROOT")]
    root: Option<PathBuf>,

    /// Engine stack to operate on
    #[arg(
        short = 's',
        long,
        global = true,
        env = "STACKFLOW_STACK",
        default_value = "dev"
    )]
    stack: String,

    /// pulumi binary to run
    #[arg(long, global = true, env = "STACKFLOW_PULUMI_BIN", default_value = "pulumi")]
    pulumi_bin: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the declaration and its resource graph
    Validate,
    /// Show creation order, layers and references
    Graph {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render the Pulumi YAML program
    Render {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Preview what a deployment would change
    Preview,
    /// Deploy the stack
    Up {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Destroy every resource of the stack
    Destroy {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the exported outputs
    Outputs {
        /// Fail when a declared output is missing or empty
        #[arg(long)]
        check: bool,
    },
    /// Write the built-in declaration as stack.kdl and boot.sh
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("stackflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let start = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir()?,
    };

    if let Commands::Init { force } = cli.command {
        return commands::init::handle(&start, force);
    }

    let options = utils::EngineOptions {
        stack: cli.stack,
        pulumi_bin: cli.pulumi_bin,
    };

    match cli.command {
        Commands::Validate => commands::validate::handle(&start),
        Commands::Graph { json } => commands::graph::handle(&start, json),
        Commands::Render { output } => commands::render::handle(&start, output.as_deref()),
        Commands::Preview => commands::preview::handle(&start, &options).await,
        Commands::Up { yes } => commands::up::handle(&start, &options, yes).await,
        Commands::Destroy { yes } => commands::destroy::handle(&start, &options, yes).await,
        Commands::Outputs { check } => commands::outputs::handle(&start, &options, check).await,
        Commands::Init { .. } | Commands::Version => Ok(()),
    }
}
