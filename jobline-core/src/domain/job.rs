//! Job domain types

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Work category assigned to every job created through the API.
pub const DEFAULT_JOB_TYPE: &str = "mock";

/// Retry ceiling used when the caller does not supply one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Prefix of every error message produced by an attempt that hit its deadline.
pub const TIMEOUT_MESSAGE_PREFIX: &str = "job timed out";

/// Durable record of one unit of work
///
/// Created once by the API, mutated only by the worker afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    /// JSON text handed to the execution strategy untouched
    pub payload: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of attempts that have failed so far
    pub retries: u32,
    pub max_retries: u32,
    /// Last failure reason, empty until the first failure
    pub error_message: String,
}

impl JobRecord {
    /// Builds a fresh `pending` record with a new id and zeroed counters.
    ///
    /// Timestamps are truncated to microseconds, the precision PostgreSQL keeps,
    /// so the record handed back at enqueue time serializes exactly like the
    /// one read back from the store later.
    pub fn new_pending(payload: String, max_retries: u32) -> Self {
        let now = Utc::now().trunc_subsecs(6);
        Self {
            id: Uuid::new_v4().to_string(),
            job_type: DEFAULT_JOB_TYPE.to_string(),
            payload,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            retries: 0,
            max_retries,
            error_message: String::new(),
        }
    }

    /// True once another failure would exhaust the retry budget.
    pub fn is_last_attempt(&self) -> bool {
        self.retries.saturating_add(1) >= self.max_retries
    }
}

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    /// Text stored in the `status` column and used on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }

    /// Success and failed records are never processed again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }

    /// Legal moves: pending -> running, running -> success | pending | failed.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Success)
                | (JobStatus::Running, JobStatus::Pending)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a persisted status column holds an unknown value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown job status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pending_defaults() {
        let job = JobRecord::new_pending("\"send_email\"".to_string(), DEFAULT_MAX_RETRIES);

        assert!(Uuid::parse_str(&job.id).is_ok());
        assert_eq!(job.job_type, DEFAULT_JOB_TYPE);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retries, 0);
        assert_eq!(job.max_retries, 3);
        assert!(job.error_message.is_empty());
        assert_eq!(job.created_at, job.updated_at);
        assert_eq!(job.created_at.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = JobRecord::new_pending("\"a\"".to_string(), 3);
        let b = JobRecord::new_pending("\"a\"".to_string(), 3);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_record_json_shape() {
        let job = JobRecord::new_pending("\"fail\"".to_string(), 3);
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["type"], "mock");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["payload"], "\"fail\"");
        assert_eq!(value["retries"], 0);
        assert_eq!(value["max_retries"], 3);
        assert_eq!(value["error_message"], "");
        assert!(value.get("job_type").is_none());

        let back: JobRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_status_text_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Success,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("Queued".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_transitions() {
        use JobStatus::*;

        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Success));
        assert!(Running.can_transition_to(Pending));
        assert!(Running.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Success));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Success.can_transition_to(Running));
        assert!(!Failed.can_transition_to(Pending));
    }

    #[test]
    fn test_is_last_attempt() {
        let mut job = JobRecord::new_pending("\"fail\"".to_string(), 3);
        assert!(!job.is_last_attempt());
        job.retries = 2;
        assert!(job.is_last_attempt());

        let zero = JobRecord::new_pending("\"fail\"".to_string(), 0);
        assert!(zero.is_last_attempt());
    }
}
