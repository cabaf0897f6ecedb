//! PostgreSQL Job Store
//!
//! Handles all database operations related to jobs.

use async_trait::async_trait;
use jobline_core::domain::job::{JobRecord, JobStatus};
use sqlx::PgPool;
use std::time::Duration;

use super::{JobStore, stale_cutoff};
use crate::db;
use crate::error::StoreError;

/// Job Store backed by a shared PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool and makes sure the schema exists
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = db::create_pool(database_url).await?;
        db::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Closes every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: &JobRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, type, payload, status, created_at, updated_at,
                              retries, max_retries, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&job.id)
        .bind(&job.job_type)
        .bind(&job.payload)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(to_column(job.retries)?)
        .bind(to_column(job.max_retries)?)
        .bind(&job.error_message)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(StoreError::AlreadyExists(job.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn read(&self, id: &str) -> Result<JobRecord, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, type AS job_type, payload, status, created_at, updated_at,
                   retries, max_retries, error_message
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        row.try_into()
    }

    async fn update_status(&self, id: &str, status: JobStatus) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await;

        expect_one_row(id, result)
    }

    async fn update_retry(
        &self,
        id: &str,
        retries: u32,
        error_message: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET retries = $1, error_message = $2, updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(to_column(retries)?)
        .bind(error_message)
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await;

        expect_one_row(id, result)
    }

    async fn update_failure(
        &self,
        id: &str,
        retries: u32,
        max_retries: u32,
        error_message: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, retries = $2, max_retries = $3, error_message = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(JobStatus::Failed.as_str())
        .bind(to_column(retries)?)
        .bind(to_column(max_retries)?)
        .bind(error_message)
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await;

        expect_one_row(id, result)
    }

    async fn update_success(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, error_message = '', updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(JobStatus::Success.as_str())
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await;

        expect_one_row(id, result)
    }

    async fn find_stale_running(&self, older_than: Duration) -> Result<Vec<String>, StoreError> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT id
            FROM jobs
            WHERE status = $1 AND updated_at < $2
            ORDER BY updated_at ASC
            "#,
        )
        .bind(JobStatus::Running.as_str())
        .bind(stale_cutoff(older_than))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Turns "no row touched" into NotFound
fn expect_one_row(
    id: &str,
    result: Result<sqlx::postgres::PgQueryResult, sqlx::Error>,
) -> Result<(), StoreError> {
    if result?.rows_affected() == 0 {
        return Err(StoreError::NotFound(id.to_string()));
    }
    Ok(())
}

fn to_column(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("counter {} does not fit INTEGER", value)))
}

fn from_column(name: &str, value: i32) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("{} is negative: {}", name, value)))
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    job_type: String,
    payload: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    retries: i32,
    max_retries: i32,
    error_message: String,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

        Ok(JobRecord {
            retries: from_column("retries", row.retries)?,
            max_retries: from_column("max_retries", row.max_retries)?,
            id: row.id,
            job_type: row.job_type,
            payload: row.payload,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            error_message: row.error_message,
        })
    }
}
