//! Error types for the store and queue

use thiserror::Error;

/// Errors raised by a [`JobStore`](crate::JobStore)
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the id
    #[error("job not found: {0}")]
    NotFound(String),

    /// A record with the id already exists
    #[error("job already exists: {0}")]
    AlreadyExists(String),

    /// A persisted row could not be mapped back onto a Job Record
    #[error("invalid job record: {0}")]
    InvalidRecord(String),

    /// Transport or engine failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Check if this error means the id is unknown
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors raised by a [`WorkQueue`](crate::WorkQueue)
#[derive(Debug, Error)]
pub enum QueueError {
    /// Connection or command failure against Redis
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The transport answered with something other than a queue item
    #[error("unexpected queue reply: {0}")]
    UnexpectedReply(String),
}
