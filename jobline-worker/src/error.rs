//! Infrastructure faults seen by the worker
//!
//! None of these consume a job's retry budget; the loop logs them and backs off.

use jobline_store::{QueueError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("job store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("work queue unavailable: {0}")]
    Queue(#[from] QueueError),
}
