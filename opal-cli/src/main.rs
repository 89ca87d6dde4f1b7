//! OPAL CLI
//!
//! Command-line interface for driving an OPAL compute node.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "opal")]
#[command(about = "OPAL compute node CLI", long_about = None)]
struct Cli {
    /// Compute node URL
    #[arg(long, env = "OPAL_COMPUTE_URL", default_value = "http://localhost:8080")]
    compute_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        compute_url: cli.compute_url,
    };

    handle_command(cli.command, &config).await
}
