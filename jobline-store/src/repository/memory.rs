//! In-memory Job Store
//!
//! Same contract as the PostgreSQL store, kept in a process-local map.
//! Used by tests and by embedders that run the API and worker in one process.

use async_trait::async_trait;
use jobline_core::domain::job::{JobRecord, JobStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{JobStore, stale_cutoff};
use crate::error::StoreError;

#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<HashMap<String, JobRecord>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }

    /// Applies `apply` to the record and refreshes `updated_at`
    async fn modify<F>(&self, id: &str, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut JobRecord) + Send,
    {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        apply(job);
        job.updated_at = chrono::Utc::now();
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &JobRecord) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id.clone()));
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<JobRecord, StoreError> {
        self.jobs
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_status(&self, id: &str, status: JobStatus) -> Result<(), StoreError> {
        self.modify(id, |job| job.status = status).await
    }

    async fn update_retry(
        &self,
        id: &str,
        retries: u32,
        error_message: &str,
    ) -> Result<(), StoreError> {
        self.modify(id, |job| {
            job.retries = retries;
            job.error_message = error_message.to_string();
        })
        .await
    }

    async fn update_failure(
        &self,
        id: &str,
        retries: u32,
        max_retries: u32,
        error_message: &str,
    ) -> Result<(), StoreError> {
        self.modify(id, |job| {
            job.status = JobStatus::Failed;
            job.retries = retries;
            job.max_retries = max_retries;
            job.error_message = error_message.to_string();
        })
        .await
    }

    async fn update_success(&self, id: &str) -> Result<(), StoreError> {
        self.modify(id, |job| {
            job.status = JobStatus::Success;
            job.error_message.clear();
        })
        .await
    }

    async fn find_stale_running(&self, older_than: Duration) -> Result<Vec<String>, StoreError> {
        let cutoff = stale_cutoff(older_than);
        let jobs = self.jobs.lock().await;

        let mut stale: Vec<&JobRecord> = jobs
            .values()
            .filter(|job| job.status == JobStatus::Running && job.updated_at < cutoff)
            .collect();
        stale.sort_by_key(|job| job.updated_at);

        Ok(stale.into_iter().map(|job| job.id.clone()).collect())
    }
}
