//! Redis-backed Work Queue
//!
//! Producers LPUSH onto a list and the consumer BRPOPs from the other end,
//! giving FIFO order across any number of processes.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::WorkQueue;
use crate::error::QueueError;

/// Server-side wait for a single BRPOP before it is re-issued
const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Work Queue on a Redis list
///
/// Connections are opened lazily and dropped after a transport error so the
/// next call reconnects. Blocking pops get their own connection so they never
/// stall pushes issued from the same process.
pub struct RedisQueue {
    client: redis::Client,
    queue: String,
    block_timeout: Duration,
    push_conn: Mutex<Option<MultiplexedConnection>>,
    pop_conn: Mutex<Option<MultiplexedConnection>>,
}

impl std::fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQueue")
            .field("queue", &self.queue)
            .field("block_timeout", &self.block_timeout)
            .finish()
    }
}

impl RedisQueue {
    /// Creates a queue handle; no connection is made until first use
    ///
    /// # Arguments
    /// * `addr` - `host:port` or a full `redis://` / `rediss://` URL
    /// * `queue` - Name of the Redis list
    pub fn new(addr: &str, queue: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url(addr))?;

        Ok(Self {
            client,
            queue: queue.to_string(),
            block_timeout: DEFAULT_BLOCK_TIMEOUT,
            push_conn: Mutex::new(None),
            pop_conn: Mutex::new(None),
        })
    }

    /// Overrides how long one BRPOP waits server-side before being re-issued
    pub fn with_block_timeout(mut self, block_timeout: Duration) -> Self {
        self.block_timeout = block_timeout;
        self
    }

    /// Name of the underlying Redis list
    pub fn name(&self) -> &str {
        &self.queue
    }

    /// Returns the cached connection in `slot`, opening one if needed
    async fn connection(
        &self,
        slot: &mut Option<MultiplexedConnection>,
    ) -> Result<MultiplexedConnection, QueueError> {
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        debug!(queue = %self.queue, "Opening Redis connection");
        let conn = self.client.get_multiplexed_async_connection().await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    fn block_timeout_secs(&self) -> u64 {
        self.block_timeout.as_secs().max(1)
    }
}

#[async_trait]
impl WorkQueue for RedisQueue {
    async fn enqueue(&self, job_id: &str) -> Result<(), QueueError> {
        let mut slot = self.push_conn.lock().await;
        let mut conn = self.connection(&mut slot).await?;

        let result = redis::cmd("LPUSH")
            .arg(&self.queue)
            .arg(job_id)
            .query_async::<_, i64>(&mut conn)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                *slot = None;
                Err(err.into())
            }
        }
    }

    async fn dequeue(&self) -> Result<String, QueueError> {
        let mut slot = self.pop_conn.lock().await;

        loop {
            let mut conn = self.connection(&mut slot).await?;

            let reply = redis::cmd("BRPOP")
                .arg(&self.queue)
                .arg(self.block_timeout_secs())
                .query_async::<_, Option<Vec<String>>>(&mut conn)
                .await;

            match reply {
                Ok(Some(mut values)) => {
                    if values.len() != 2 {
                        return Err(QueueError::UnexpectedReply(format!("{:?}", values)));
                    }
                    return Ok(values.swap_remove(1));
                }
                Ok(None) => {
                    trace!(queue = %self.queue, "BRPOP timed out, waiting again");
                }
                Err(err) => {
                    *slot = None;
                    return Err(err.into());
                }
            }
        }
    }

    async fn depth(&self) -> Result<usize, QueueError> {
        let mut slot = self.push_conn.lock().await;
        let mut conn = self.connection(&mut slot).await?;

        let result = redis::cmd("LLEN")
            .arg(&self.queue)
            .query_async::<_, usize>(&mut conn)
            .await;

        result.map_err(|err| {
            *slot = None;
            err.into()
        })
    }
}

/// Accepts the bare `host:port` form used in the environment
fn redis_url(addr: &str) -> String {
    if addr.starts_with("redis://") || addr.starts_with("rediss://") {
        addr.to_string()
    } else {
        format!("redis://{}", addr)
    }
}
