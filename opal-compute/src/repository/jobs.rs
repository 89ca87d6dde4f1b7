//! Jobs repository
//!
//! Reads job documents and writes back the fields the engine owns.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opal_core::domain::job::{Job, JobParams, JobType, StatusEntry};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

/// Repository trait for job documents
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Loads a job document by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>>;

    /// Persists the execution state of a job
    ///
    /// Only the engine-owned fields are written (`status`, `startDate`,
    /// `endDate`, `stdout`, `stderr`, `exitCode`, `message`); everything
    /// else on the stored document is left untouched.
    async fn update_execution(&self, job: &Job) -> Result<()>;
}

/// Postgres implementation of JobRepository
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, job_type, status, params, start_date, end_date,
                   stdout, stderr, exit_code, message
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load job {}", id))?;

        row.map(Job::try_from).transpose()
    }

    async fn update_execution(&self, job: &Job) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, start_date = $2, end_date = $3, stdout = $4,
                stderr = $5, exit_code = $6, message = $7
            WHERE id = $8
            "#,
        )
        .bind(Json(&job.status))
        .bind(job.start_date)
        .bind(job.end_date)
        .bind(&job.stdout)
        .bind(&job.stderr)
        .bind(job.exit_code)
        .bind(&job.message)
        .bind(job.id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to persist job {}", job.id))?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Job {} no longer exists", job.id);
        }

        Ok(())
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    job_type: String,
    status: Json<Vec<StatusEntry>>,
    params: Json<JobParams>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
    message: Option<String>,
}

impl TryFrom<JobRow> for Job {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> Result<Self> {
        let job_type = row
            .job_type
            .parse::<JobType>()
            .map_err(|e| anyhow::anyhow!("Job {}: {}", row.id, e))?;

        Ok(Job {
            id: row.id,
            job_type,
            status: row.status.0,
            params: row.params.0,
            start_date: row.start_date,
            end_date: row.end_date,
            stdout: row.stdout,
            stderr: row.stderr,
            exit_code: row.exit_code,
            message: row.message,
        })
    }
}
