//! Job Service
//!
//! Creates jobs and reads their state. The worker owns every transition
//! after creation.

use jobline_core::domain::job::JobRecord;
use jobline_core::dto::job::EnqueueJob;
use jobline_store::{JobStore, QueueError, StoreError, WorkQueue};

/// Service error type
#[derive(Debug)]
pub enum JobError {
    NotFound(String),
    ValidationError(String),
    StoreError(StoreError),
    QueueError(QueueError),
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => JobError::NotFound(id),
            other => JobError::StoreError(other),
        }
    }
}

impl From<QueueError> for JobError {
    fn from(err: QueueError) -> Self {
        JobError::QueueError(err)
    }
}

/// Persist a new pending job, then hand its id to the queue
///
/// The record is written first so the worker can always load what it pops.
/// If the push fails the record stays `pending` and the caller gets the error.
pub async fn enqueue_job(
    store: &dyn JobStore,
    queue: &dyn WorkQueue,
    req: EnqueueJob,
    max_retries: u32,
) -> Result<JobRecord, JobError> {
    let payload = encode_payload(req.data);
    let job = JobRecord::new_pending(payload, max_retries);

    store.create(&job).await?;

    if let Err(err) = queue.enqueue(&job.id).await {
        tracing::error!("Job {} saved but could not be queued: {}", job.id, err);
        return Err(err.into());
    }

    tracing::info!("Job created: {} (max_retries={})", job.id, job.max_retries);

    Ok(job)
}

/// Get a job by ID
pub async fn get_job(store: &dyn JobStore, id: &str) -> Result<JobRecord, JobError> {
    validate_job_id(id)?;
    let job = store.read(id).await?;
    Ok(job)
}

// =============================================================================
// Validation
// =============================================================================

/// The payload column holds the JSON encoding of the submitted string
fn encode_payload(data: String) -> String {
    serde_json::Value::String(data).to_string()
}

fn validate_job_id(id: &str) -> Result<(), JobError> {
    if id.trim().is_empty() {
        return Err(JobError::ValidationError("missing job id".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobline_core::domain::job::JobStatus;
    use jobline_store::{MemoryJobStore, MemoryQueue};

    #[test]
    fn test_encode_payload_is_json_string() {
        assert_eq!(encode_payload("fail".to_string()), "\"fail\"");
        assert_eq!(
            encode_payload("say \"hi\"".to_string()),
            r#""say \"hi\"""#
        );
    }

    #[test]
    fn test_validate_job_id() {
        assert!(validate_job_id("abc").is_ok());
        assert!(matches!(
            validate_job_id("  "),
            Err(JobError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_enqueue_persists_then_queues() {
        let store = MemoryJobStore::new();
        let queue = MemoryQueue::new();

        let job = enqueue_job(
            &store,
            &queue,
            EnqueueJob {
                data: "send_email".to_string(),
            },
            3,
        )
        .await
        .unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.payload, "\"send_email\"");
        assert_eq!(job.max_retries, 3);
        assert_eq!(store.read(&job.id).await.unwrap(), job);
        assert_eq!(queue.snapshot().await, vec![job.id.clone()]);
    }

    #[tokio::test]
    async fn test_get_job_unknown_id() {
        let store = MemoryJobStore::new();
        let err = get_job(&store, "missing").await.unwrap_err();
        assert!(matches!(err, JobError::NotFound(id) if id == "missing"));
    }
}
