//! Jobline CLI
//!
//! Command-line interface for submitting jobs and checking on them.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser, Debug)]
#[command(name = "jobline")]
#[command(about = "Jobline job queue CLI", long_about = None)]
struct Cli {
    /// API URL
    #[arg(long, env = "JOBLINE_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        api_url: cli.api_url,
    };

    handle_command(cli.command, &config).await
}
