//! Jobline Worker
//!
//! Consumes job ids from the work queue and drives each job through its
//! lifecycle in the job store.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Services: Execution strategy and per-attempt deadlines
//! - Scheduler: The job loop, retry policies and the stale job sweep
//!
//! One worker process runs one sequential loop. Scale out by running more
//! processes against the same queue and store.

mod config;
mod error;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use jobline_store::{JobStore, PgJobStore, RedisQueue, WorkQueue};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::scheduler::{JobWorker, Reconciler, RetryPolicy};
use crate::service::{ExecutionStrategy, SimulatedExecution};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobline_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jobline Worker");

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;
    info!(
        "Loaded configuration: queue={}, job_timeout={:?}, retry_backoff={:?}",
        config.connection.queue_name, config.job_timeout, config.retry_backoff
    );

    // Open the shared handles once for the lifetime of the process
    let pg_store = PgJobStore::connect(&config.connection.database_url)
        .await
        .context("Failed to connect to the job store")?;
    let store: Arc<dyn JobStore> = Arc::new(pg_store.clone());

    let queue: Arc<dyn WorkQueue> = Arc::new(
        RedisQueue::new(&config.connection.redis_addr, &config.connection.queue_name)
            .context("Failed to create the queue client")?,
    );

    let strategy: Arc<dyn ExecutionStrategy> = Arc::new(SimulatedExecution::default());

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let reconciler = config.stale_job_after.map(|stale_after| {
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            stale_after,
            config.sweep_interval,
            shutdown.clone(),
        );
        tokio::spawn(async move { reconciler.run().await })
    });

    let mut worker = JobWorker::new(
        store,
        queue,
        strategy,
        config.job_timeout,
        RetryPolicy::new(config.retry_backoff),
        shutdown.clone(),
    )
    .with_deadline_grace(config.deadline_grace);
    if let Some(every) = config.lease_refresh() {
        worker = worker.with_lease_refresh(every);
    }

    info!("Worker initialized successfully");
    worker.run().await;

    // The loop only returns on shutdown; make sure the sweep follows it
    shutdown.cancel();
    if let Some(handle) = reconciler {
        if let Err(e) = handle.await {
            error!("Reconciler task panicked: {}", e);
        }
    }

    pg_store.close().await;
    info!("Jobline Worker stopped");

    Ok(())
}

/// Cancels `shutdown` on Ctrl-C
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, finishing current attempt");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });
}
