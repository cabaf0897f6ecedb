//! Job DTOs for the HTTP surface

use serde::{Deserialize, Serialize};

/// Body of `POST /enqueue`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueJob {
    pub data: String,
}

/// JSON error envelope returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
