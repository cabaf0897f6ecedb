//! Job Store
//!
//! Keyed storage for Job Records. Every operation is an independent point
//! read or point update on a single id; nothing spans more than one call.

mod memory;
mod postgres;

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

use async_trait::async_trait;
use jobline_core::domain::job::{JobRecord, JobStatus};
use std::time::Duration;

use crate::error::StoreError;

/// Storage contract used by the API and the worker
///
/// All writes refresh `updated_at`. Updates on an unknown id fail with
/// [`StoreError::NotFound`].
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new record; the caller has already set pending defaults
    async fn create(&self, job: &JobRecord) -> Result<(), StoreError>;

    /// Point lookup by id
    async fn read(&self, id: &str) -> Result<JobRecord, StoreError>;

    /// Sets the status only
    async fn update_status(&self, id: &str, status: JobStatus) -> Result<(), StoreError>;

    /// Persists the retry counter and latest error text, leaving status alone
    async fn update_retry(
        &self,
        id: &str,
        retries: u32,
        error_message: &str,
    ) -> Result<(), StoreError>;

    /// Marks the record failed together with its final counters
    async fn update_failure(
        &self,
        id: &str,
        retries: u32,
        max_retries: u32,
        error_message: &str,
    ) -> Result<(), StoreError>;

    /// Marks the record succeeded and clears any error left by earlier attempts
    async fn update_success(&self, id: &str) -> Result<(), StoreError>;

    /// Ids of records stuck in `running` with no write for longer than `older_than`
    async fn find_stale_running(&self, older_than: Duration) -> Result<Vec<String>, StoreError>;
}

/// Cut-off timestamp for [`JobStore::find_stale_running`]
pub(crate) fn stale_cutoff(older_than: Duration) -> chrono::DateTime<chrono::Utc> {
    let age = chrono::TimeDelta::from_std(older_than)
        .unwrap_or_else(|_| chrono::TimeDelta::days(365 * 100));
    chrono::Utc::now() - age
}
