use anyhow::{Context, Result};
use jobline_store::{PgJobStore, RedisQueue};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod service;
pub mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobline_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Jobline API...");

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Connecting to database...");

    // Pool plus migrations
    let store = PgJobStore::connect(&config.connection.database_url)
        .await
        .context("Failed to connect to the job store")?;

    tracing::info!("Database connection pool created");

    let queue = RedisQueue::new(&config.connection.redis_addr, &config.connection.queue_name)
        .context("Failed to create the queue client")?;

    tracing::info!(
        "Using queue '{}' at {}",
        config.connection.queue_name,
        config.connection.redis_addr
    );

    let pool_handle = store.clone();
    let state = AppState::new(Arc::new(store), Arc::new(queue), config.default_max_retries);

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool_handle.close().await;
    tracing::info!("Jobline API stopped");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received shutdown signal"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
