//! Job command handlers

use anyhow::{Context, Result};
use colored::*;
use opal_client::ComputeClient;
use opal_core::domain::job::{Job, JobStatus};
use uuid::Uuid;

use crate::config::Config;

/// Ask the node to run a job
pub async fn run_job(config: &Config, job_id: Uuid) -> Result<()> {
    let client = ComputeClient::new(&config.compute_url);
    let job = client
        .run_job(job_id)
        .await
        .with_context(|| format!("Failed to run job {}", job_id))?;

    println!("{} Job {} accepted", "✓".green(), job.id.to_string().cyan());
    print_job_details(&job);
    Ok(())
}

/// Cancel the running job
pub async fn cancel_job(config: &Config) -> Result<()> {
    let client = ComputeClient::new(&config.compute_url);
    let job = client.cancel_job().await.context("Failed to cancel job")?;

    println!("{} Job {} cancelled", "✓".green(), job.id.to_string().cyan());
    print_job_details(&job);
    Ok(())
}

/// Print detailed job information
fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:         {}", job.id.to_string().cyan());
    println!("  Type:       {}", job.job_type);
    println!("  Algorithm:  {}", job.params.algorithm_name);
    println!(
        "  Window:     {} .. {}",
        job.params.start_date.format("%Y-%m-%d %H:%M:%S"),
        job.params.end_date.format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Sampling:   {}", job.params.sampling);

    if let Some(status) = job.current_status() {
        println!("  Status:     {}", colorize_status(status));
    }

    if let Some(started) = job.start_date {
        println!("  Started:    {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(ended) = job.end_date {
        println!("  Ended:      {}", ended.format("%Y-%m-%d %H:%M:%S"));

        if let Some(started) = job.start_date {
            let duration = ended.signed_duration_since(started);
            println!("  Duration:   {}s", duration.num_seconds());
        }
    }

    if let Some(code) = job.exit_code {
        println!("  Exit Code:  {}", code);
    }

    if job.status.len() > 1 {
        println!("\n{}", "History:".bold());
        for entry in &job.status {
            println!(
                "  {} {}",
                entry.at.format("%H:%M:%S").to_string().dimmed(),
                colorize_status(entry.status)
            );
        }
    }

    if let Some(message) = &job.message {
        println!("\n{}", "Message:".bold());
        match job.current_status() {
            Some(JobStatus::Error) => println!("{}", message.red()),
            _ => println!("{}", message),
        }
    }
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Created => status_str.yellow(),
        JobStatus::TransferringData => status_str.blue(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Success => status_str.green(),
        JobStatus::Error => status_str.red(),
        JobStatus::Cancelled => status_str.dimmed(),
    }
}
