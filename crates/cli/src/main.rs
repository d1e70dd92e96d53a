//! Insta-Unblock CLI - iub command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod locks;
mod util;

/// Insta-Unblock - unblock downloaded files once they stop changing
#[derive(Parser)]
#[command(name = "iub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (default: user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the downloads directory and unblock files as they settle
    Run,
    /// Turn unblocking on (takes effect on the next sweep of a running daemon)
    Enable,
    /// Turn unblocking off (pending files keep aging, nothing is unblocked)
    Disable,
    /// Show the current mode and effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => cmd::run::run(cli.config.as_deref()).await,
        Commands::Enable => cmd::enable::run(true),
        Commands::Disable => cmd::enable::run(false),
        Commands::Status => cmd::status::run(cli.config.as_deref()),
    }
}
