//! Gridlink - telemetry forwarding agent for racing-sim rigs
//!
//! # Usage
//!
//! ```bash
//! # Run the agent (default)
//! gridlink
//! gridlink --rig 1 --config gridlink.toml
//!
//! # Inspect the resolved route table for a rig
//! gridlink routes --rig 1
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Build branch baked in at compile time
pub(crate) const BRANCH: &str = match option_env!("GRIDLINK_BRANCH") {
    Some(branch) => branch,
    None => "dev",
};

/// Gridlink - telemetry forwarding agent for racing-sim rigs
#[derive(Parser, Debug)]
#[command(name = "gridlink")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Rig id to run. Overrides config file.
    #[arg(short, long, global = true)]
    rig: Option<String>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the agent
    Run,

    /// Print the resolved route table for a rig
    Routes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = cmd::SessionArgs {
        config: cli.config,
        rig: cli.rig,
        log_level: cli.log_level,
    };

    match cli.command {
        // Routes prints to stdout, no logging needed
        Some(Command::Routes) => cmd::routes::run(args),

        // No subcommand = run the agent (default behavior)
        Some(Command::Run) | None => cmd::run::run(args).await,
    }
}
