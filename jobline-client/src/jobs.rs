//! Job-related API endpoints

use crate::JobClient;
use crate::error::{ClientError, Result};
use jobline_core::domain::job::JobRecord;
use jobline_core::dto::job::EnqueueJob;
use std::time::Duration;
use tokio::time::Instant;

impl JobClient {
    // =============================================================================
    // Job Submission
    // =============================================================================

    /// Submit a job
    ///
    /// # Arguments
    /// * `data` - The string handed to the worker as the job payload
    ///
    /// # Returns
    /// The created `pending` job
    pub async fn enqueue(&self, data: impl Into<String>) -> Result<JobRecord> {
        let url = format!("{}/enqueue", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EnqueueJob { data: data.into() })
            .send()
            .await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Job Status
    // =============================================================================

    /// Get the current record for a job
    pub async fn get_status(&self, job_id: &str) -> Result<JobRecord> {
        let url = format!("{}/status/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Poll a job until it succeeds or fails for good
    ///
    /// # Arguments
    /// * `job_id` - The job to watch
    /// * `poll_interval` - Pause between status requests
    /// * `timeout` - Give up with [`ClientError::Timeout`] after this long
    pub async fn wait_for_terminal(
        &self,
        job_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<JobRecord> {
        let started = Instant::now();

        loop {
            let job = self.get_status(job_id).await?;
            if job.status.is_terminal() {
                return Ok(job);
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(ClientError::Timeout {
                    job_id: job_id.to_string(),
                    waited,
                });
            }

            tracing::debug!("Job {} is {}, polling again", job_id, job.status);
            tokio::time::sleep(poll_interval.min(timeout - waited)).await;
        }
    }
}
