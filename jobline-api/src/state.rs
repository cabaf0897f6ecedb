//! Shared handler state

use jobline_store::{JobStore, WorkQueue};
use std::sync::Arc;

/// Handles opened once at start-up and shared by every request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub default_max_retries: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<dyn WorkQueue>, default_max_retries: u32) -> Self {
        Self {
            store,
            queue,
            default_max_retries,
        }
    }
}
