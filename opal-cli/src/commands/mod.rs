//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;
mod node;

use anyhow::Result;
use clap::Subcommand;
use uuid::Uuid;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a job on the compute node
    Run {
        /// Job ID
        job_id: Uuid,
    },
    /// Cancel the job running on the compute node
    Cancel,
    /// Show whether the compute node is idle or busy
    Status,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run { job_id } => job::run_job(config, job_id).await,
        Commands::Cancel => job::cancel_job(config).await,
        Commands::Status => node::show_status(config).await,
    }
}
