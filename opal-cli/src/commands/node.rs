//! Node command handlers

use anyhow::{Context, Result};
use colored::*;
use opal_client::ComputeClient;
use opal_core::domain::node::NodeStatus;

use crate::config::Config;

/// Show the node's availability
pub async fn show_status(config: &Config) -> Result<()> {
    let client = ComputeClient::new(&config.compute_url);
    let status = client
        .status()
        .await
        .with_context(|| format!("Failed to reach compute node at {}", config.compute_url))?;

    let label = match status.status {
        NodeStatus::Idle => status.status.to_string().green(),
        NodeStatus::Busy => status.status.to_string().yellow(),
    };

    println!("{}", "Node Status:".bold());
    println!("  URL:     {}", client.base_url().dimmed());
    println!("  Status:  {}", label);
    println!(
        "  Since:   {}",
        status.since.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
    );
    if let Some(job_id) = status.job_id {
        println!("  Job:     {}", job_id.to_string().cyan());
    }

    Ok(())
}
