//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;

use anyhow::Result;
use clap::Subcommand;
use jobline_client::JobClient;
use std::time::Duration;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Submit a job
    Enqueue {
        /// String handed to the worker as the payload
        data: String,
    },
    /// Show the current state of a job
    Status {
        /// Job ID
        id: String,
    },
    /// Wait until a job succeeds or fails
    Wait {
        /// Job ID
        id: String,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,

        /// Pause between status checks, in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = JobClient::new(config.api_url.as_str());

    match command {
        Commands::Enqueue { data } => job::enqueue(&client, &data).await,
        Commands::Status { id } => job::status(&client, &id).await,
        Commands::Wait {
            id,
            timeout_secs,
            interval_ms,
        } => {
            job::wait(
                &client,
                &id,
                Duration::from_secs(timeout_secs),
                Duration::from_millis(interval_ms),
            )
            .await
        }
    }
}
