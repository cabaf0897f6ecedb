//! Jobline Store
//!
//! Durable job storage and the work queue, shared by the API and the worker.
//!
//! Both collaborators are expressed as object-safe traits so the API and the
//! worker can be handed explicitly constructed handles:
//! - [`JobStore`]: keyed Job Record storage (PostgreSQL or in-memory)
//! - [`WorkQueue`]: FIFO relay of job ids (Redis or in-memory)
//!
//! # Example
//!
//! ```no_run
//! use jobline_store::{ConnectionConfig, PgJobStore, RedisQueue};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ConnectionConfig::from_env();
//! let store = PgJobStore::connect(&config.database_url).await?;
//! let queue = RedisQueue::new(&config.redis_addr, &config.queue_name)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod queue;
pub mod repository;

pub use config::ConnectionConfig;
pub use error::{QueueError, StoreError};
pub use queue::{MemoryQueue, RedisQueue, WorkQueue};
pub use repository::{JobStore, MemoryJobStore, PgJobStore};
