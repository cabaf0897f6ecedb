//! Job command handlers
//!
//! Submitting jobs, looking up their status and waiting for them to finish.

use anyhow::{Context, Result};
use colored::*;
use jobline_client::{JobClient, JobRecord, JobStatus};
use std::time::Duration;

/// Submit a job and print the created record
pub async fn enqueue(client: &JobClient, data: &str) -> Result<()> {
    let job = client
        .enqueue(data)
        .await
        .context("Failed to enqueue job")?;

    println!("{} Job queued", "✓".green());
    println!("  ID:      {}", job.id.cyan());
    println!("  Payload: {}", job.payload.dimmed());
    println!();
    println!(
        "{}",
        format!("Check progress with: jobline status {}", job.id).dimmed()
    );

    Ok(())
}

/// Get and display a single job
pub async fn status(client: &JobClient, id: &str) -> Result<()> {
    let job = client
        .get_status(id)
        .await
        .with_context(|| format!("Failed to get status of job {}", id))?;

    print_job_details(&job);

    Ok(())
}

/// Poll until the job succeeds or fails for good
pub async fn wait(
    client: &JobClient,
    id: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    println!(
        "{}",
        format!("Waiting up to {}s for job {}...", timeout.as_secs(), id).dimmed()
    );

    let job = client
        .wait_for_terminal(id, interval, timeout)
        .await
        .with_context(|| format!("Failed while waiting for job {}", id))?;

    print_job_details(&job);

    if job.status == JobStatus::Failed {
        anyhow::bail!("job {} failed after {} attempt(s)", job.id, job.retries);
    }

    Ok(())
}

/// Print detailed job information
fn print_job_details(job: &JobRecord) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.id.cyan());
    println!("  Type:        {}", job.job_type);
    println!("  Status:      {}", colorize_status(job.status));
    println!("  Payload:     {}", job.payload);
    println!(
        "  Created:     {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Updated:     {}",
        job.updated_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Retries:     {}/{}", job.retries, job.max_retries);

    if !job.error_message.is_empty() {
        println!("\n{}", "Error:".bold());
        println!("{}", job.error_message.red());
    }
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Success => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}
