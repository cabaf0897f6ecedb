//! Job worker
//!
//! A single sequential consumer. Each iteration pops one id, loads its
//! record, runs one attempt under a deadline and persists the outcome before
//! the next pop. Only execution failures spend the job's retry budget;
//! queue and store faults are logged and backed off.

use jobline_core::domain::job::{JobRecord, JobStatus};
use jobline_store::{JobStore, QueueError, StoreError, WorkQueue};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::WorkerError;
use crate::scheduler::policy::{InfraBackoff, RetryDecision, RetryPolicy};
use crate::service::{Deadline, ExecutionFailure, ExecutionStrategy};

/// Extra time a strategy gets past its deadline before the attempt is dropped
pub const DEFAULT_DEADLINE_GRACE: Duration = Duration::from_millis(500);

/// How one dequeued id was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    /// Failed with budget left; the id is back on the queue
    Retrying { retries: u32 },
    /// Failed for the last time; the record is `failed` for good
    TerminallyFailed { retries: u32 },
    /// Nothing ran: unknown id or a record that is not `pending`
    Skipped,
}

pub struct JobWorker {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn WorkQueue>,
    strategy: Arc<dyn ExecutionStrategy>,
    job_timeout: Duration,
    deadline_grace: Duration,
    /// How often a job waiting out its backoff rewrites its record
    lease_refresh: Option<Duration>,
    retry_policy: RetryPolicy,
    shutdown: CancellationToken,
}

impl JobWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn WorkQueue>,
        strategy: Arc<dyn ExecutionStrategy>,
        job_timeout: Duration,
        retry_policy: RetryPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            queue,
            strategy,
            job_timeout,
            deadline_grace: DEFAULT_DEADLINE_GRACE,
            lease_refresh: None,
            retry_policy,
            shutdown,
        }
    }

    pub fn with_deadline_grace(mut self, grace: Duration) -> Self {
        self.deadline_grace = grace;
        self
    }

    /// Keeps `updated_at` fresh during retry backoff so the stale job sweep
    /// never takes a waiting job for an abandoned one
    pub fn with_lease_refresh(mut self, every: Duration) -> Self {
        self.lease_refresh = Some(every);
        self
    }

    /// Runs until the shutdown token is cancelled
    ///
    /// Shutdown is only observed while waiting on the queue or backing off,
    /// so an attempt that has started always reaches its outcome.
    pub async fn run(&self) {
        info!("Starting job worker (job timeout: {:?})", self.job_timeout);

        let mut backoff = InfraBackoff::default();

        loop {
            let popped = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                popped = self.queue.dequeue() => popped,
            };

            let result = match popped {
                Ok(job_id) => self.process(&job_id).await.map(|outcome| {
                    debug!(job.id = %job_id, ?outcome, "Attempt finished");
                }),
                Err(e) => Err(WorkerError::from(e)),
            };

            match result {
                Ok(()) => backoff.reset(),
                Err(e) => {
                    let delay = backoff.next_delay();
                    error!("Infrastructure fault: {} (backing off {:?})", e, delay);

                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!("Job worker stopped");
    }

    /// Handles one dequeued id from load to persisted outcome
    #[instrument(skip(self, job_id), fields(job.id = %job_id))]
    pub async fn process(&self, job_id: &str) -> Result<AttemptOutcome, WorkerError> {
        let job = match self.store.read(job_id).await {
            Ok(job) => job,
            Err(StoreError::NotFound(_)) => {
                warn!("Dropping id with no job record");
                return Ok(AttemptOutcome::Skipped);
            }
            Err(e) => {
                // The attempt never started, so the id goes back rather than being lost
                self.requeue(job_id).await;
                return Err(e.into());
            }
        };

        if !job.status.can_transition_to(JobStatus::Running) {
            warn!(status = %job.status, "Skipping redelivered job that is not pending");
            return Ok(AttemptOutcome::Skipped);
        }

        if let Err(e) = self.store.update_status(job_id, JobStatus::Running).await {
            if e.is_not_found() {
                warn!("Job record disappeared before it could start");
                return Ok(AttemptOutcome::Skipped);
            }
            self.requeue(job_id).await;
            return Err(e.into());
        }

        info!(
            retries = job.retries,
            max_retries = job.max_retries,
            "Running job"
        );
        if job.is_last_attempt() {
            debug!("Final attempt before the retry budget runs out");
        }

        match self.execute(&job).await {
            Ok(()) => {
                self.store.update_success(job_id).await?;
                info!("Job succeeded");
                Ok(AttemptOutcome::Succeeded)
            }
            Err(failure) => self.handle_failure(&job, failure).await,
        }
    }

    /// Runs the strategy under a fresh deadline
    ///
    /// A strategy that overruns the window by more than the grace period is
    /// dropped; one that returns late counts as timed out either way.
    async fn execute(&self, job: &JobRecord) -> Result<(), ExecutionFailure> {
        let deadline = Deadline::after(self.job_timeout);
        let attempt = self.strategy.execute(&job.payload, &deadline);

        let limit = self.job_timeout + self.deadline_grace;
        let result = match tokio::time::timeout(limit, attempt).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Execution ignored its deadline, abandoning attempt");
                deadline.cancel();
                return Err(deadline.timed_out());
            }
        };

        match result {
            Ok(()) if deadline.is_expired() => Err(deadline.timed_out()),
            other => other,
        }
    }

    async fn handle_failure(
        &self,
        job: &JobRecord,
        failure: ExecutionFailure,
    ) -> Result<AttemptOutcome, WorkerError> {
        let message = failure.to_string();

        match self.retry_policy.decide(job.retries, job.max_retries) {
            RetryDecision::Terminal { retries } => {
                self.store
                    .update_failure(&job.id, retries, job.max_retries, &message)
                    .await?;
                error!(retries, error = %message, "Job failed permanently");
                Ok(AttemptOutcome::TerminallyFailed { retries })
            }
            RetryDecision::Retry { retries, backoff } => {
                // Counters hit the store before the id is requeued
                self.store.update_retry(&job.id, retries, &message).await?;
                warn!(
                    retries,
                    max_retries = job.max_retries,
                    timed_out = failure.is_timeout(),
                    error = %message,
                    "Attempt failed, retrying in {:?}",
                    backoff
                );

                self.wait_backoff(&job.id, retries, &message, backoff).await;

                self.store.update_status(&job.id, JobStatus::Pending).await?;
                if let Err(e) = self.push_with_backoff(&job.id).await {
                    // Back to `running` so the stale job sweep can pick it up
                    if let Err(restore) =
                        self.store.update_status(&job.id, JobStatus::Running).await
                    {
                        error!("Failed to hand job over to the stale job sweep: {}", restore);
                    }
                    return Err(e.into());
                }
                Ok(AttemptOutcome::Retrying { retries })
            }
        }
    }

    /// Sleeps out a retry backoff, rewriting the retry state every
    /// `lease_refresh` when one is set
    async fn wait_backoff(&self, job_id: &str, retries: u32, message: &str, backoff: Duration) {
        let Some(refresh) = self.lease_refresh else {
            tokio::time::sleep(backoff).await;
            return;
        };

        let until = Instant::now() + backoff;
        loop {
            tokio::time::sleep_until(until.min(Instant::now() + refresh)).await;
            if Instant::now() >= until {
                return;
            }

            if let Err(e) = self.store.update_retry(job_id, retries, message).await {
                warn!("Failed to refresh job during backoff: {}", e);
            }
        }
    }

    /// Pushes an id until the queue takes it
    ///
    /// Gives up only when shutdown is requested, returning the last error.
    async fn push_with_backoff(&self, job_id: &str) -> Result<(), QueueError> {
        let mut backoff = InfraBackoff::default();

        loop {
            let err = match self.queue.enqueue(job_id).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            let delay = backoff.next_delay();
            warn!("Failed to push job onto the queue: {} (retrying in {:?})", err, delay);

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(err),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn requeue(&self, job_id: &str) {
        if let Err(e) = self.push_with_backoff(job_id).await {
            error!("Failed to put job back on the queue before shutdown: {}", e);
        }
    }
}
