//! Work Queue
//!
//! FIFO relay of job ids from producers (the API, retries, the reconciler)
//! to the worker. Delivery is at-least-once; the queue is never linked
//! transactionally to the Job Store.

mod memory;
mod redis_list;

pub use memory::MemoryQueue;
pub use redis_list::RedisQueue;

use async_trait::async_trait;

use crate::error::QueueError;

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Appends an id to the tail. Transport failures are returned, never retried here.
    async fn enqueue(&self, job_id: &str) -> Result<(), QueueError>;

    /// Removes and returns the id at the head, waiting as long as it takes for one.
    async fn dequeue(&self) -> Result<String, QueueError>;

    /// Number of ids currently waiting
    async fn depth(&self) -> Result<usize, QueueError>;
}
