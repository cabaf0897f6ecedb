//! Stale job reconciler
//!
//! A worker that dies mid-attempt leaves its job `running` with no id on the
//! queue. When enabled, this sweep treats `updated_at` as the claim time and
//! hands such jobs back to the queue once they have been quiet for too long.

use jobline_core::domain::job::JobStatus;
use jobline_store::{JobStore, WorkQueue};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::WorkerError;

pub struct Reconciler {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn WorkQueue>,
    stale_after: Duration,
    interval: Duration,
    shutdown: CancellationToken,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn WorkQueue>,
        stale_after: Duration,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            queue,
            stale_after,
            interval,
            shutdown,
        }
    }

    /// Sweeps every `interval` until the shutdown token is cancelled
    pub async fn run(&self) {
        info!(
            "Starting stale job reconciler (threshold: {:?}, interval: {:?})",
            self.stale_after, self.interval
        );

        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(0) => debug!("No stale jobs found"),
                        Ok(count) => info!("Requeued {} stale job(s)", count),
                        Err(e) => warn!("Stale job sweep failed: {}", e),
                    }
                }
            }
        }

        info!("Stale job reconciler stopped");
    }

    /// Returns stale `running` jobs to `pending` and queues them again
    pub async fn sweep_once(&self) -> Result<usize, WorkerError> {
        let stale = self.store.find_stale_running(self.stale_after).await?;
        let mut requeued = 0;

        for job_id in stale {
            match self.store.update_status(&job_id, JobStatus::Pending).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            }

            if let Err(e) = self.queue.enqueue(&job_id).await {
                // Still claimed as far as the next sweep is concerned
                if let Err(restore) =
                    self.store.update_status(&job_id, JobStatus::Running).await
                {
                    warn!(job.id = %job_id, "Failed to keep stale job visible: {}", restore);
                }
                return Err(e.into());
            }
            warn!(job.id = %job_id, "Requeued job stuck in running");
            requeued += 1;
        }

        Ok(requeued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jobline_core::domain::job::JobRecord;
    use jobline_store::{MemoryJobStore, MemoryQueue, QueueError};

    /// Queue that refuses every push
    struct OfflineQueue;

    #[async_trait]
    impl WorkQueue for OfflineQueue {
        async fn enqueue(&self, _job_id: &str) -> Result<(), QueueError> {
            Err(QueueError::UnexpectedReply("connection refused".to_string()))
        }

        async fn dequeue(&self) -> Result<String, QueueError> {
            Err(QueueError::UnexpectedReply("connection refused".to_string()))
        }

        async fn depth(&self) -> Result<usize, QueueError> {
            Err(QueueError::UnexpectedReply("connection refused".to_string()))
        }
    }

    async fn running_job(store: &MemoryJobStore) -> String {
        let job = JobRecord::new_pending("\"work\"".to_string(), 3);
        store.create(&job).await.unwrap();
        store
            .update_status(&job.id, JobStatus::Running)
            .await
            .unwrap();
        job.id
    }

    fn reconciler(
        store: Arc<MemoryJobStore>,
        queue: Arc<MemoryQueue>,
        stale_after: Duration,
    ) -> Reconciler {
        Reconciler::new(
            store,
            queue,
            stale_after,
            Duration::from_millis(10),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_sweep_requeues_stale_running_jobs() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(MemoryQueue::new());
        let id = running_job(&store).await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        let sweeper = reconciler(store.clone(), queue.clone(), Duration::from_millis(10));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 1);

        assert_eq!(store.read(&id).await.unwrap().status, JobStatus::Pending);
        assert_eq!(queue.snapshot().await, vec![id]);
    }

    #[tokio::test]
    async fn test_sweep_leaves_recent_and_idle_jobs() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(MemoryQueue::new());
        let running = running_job(&store).await;

        let pending = JobRecord::new_pending("\"work\"".to_string(), 3);
        store.create(&pending).await.unwrap();

        let sweeper = reconciler(store.clone(), queue.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);

        assert_eq!(store.read(&running).await.unwrap().status, JobStatus::Running);
        assert!(queue.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_push_leaves_job_for_next_sweep() {
        let store = Arc::new(MemoryJobStore::new());
        let id = running_job(&store).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let offline = Reconciler::new(
            store.clone(),
            Arc::new(OfflineQueue),
            Duration::from_millis(10),
            Duration::from_millis(10),
            CancellationToken::new(),
        );
        let err = offline.sweep_once().await.unwrap_err();
        assert!(matches!(err, WorkerError::Queue(_)));
        assert_eq!(store.read(&id).await.unwrap().status, JobStatus::Running);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let queue = Arc::new(MemoryQueue::new());
        let sweeper = reconciler(store.clone(), queue.clone(), Duration::from_millis(10));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
        assert_eq!(queue.snapshot().await, vec![id]);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(MemoryQueue::new());
        let shutdown = CancellationToken::new();
        let sweeper = Reconciler::new(
            store,
            queue,
            Duration::from_secs(60),
            Duration::from_millis(10),
            shutdown.clone(),
        );

        let handle = tokio::spawn(async move { sweeper.run().await });
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reconciler did not stop")
            .unwrap();
    }
}
