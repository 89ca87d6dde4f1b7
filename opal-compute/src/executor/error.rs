//! Execution errors and run outcomes

use opal_core::domain::job::{Job, JobStatus, JobType};
use thiserror::Error;
use uuid::Uuid;

use crate::service::FetchError;

/// Failure of one engine phase
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("job {0} not found")]
    JobNotFound(Uuid),

    #[error("failed to load job: {0:#}")]
    Load(anyhow::Error),

    #[error("job type '{0}' is not supported by this node")]
    UnsupportedJobType(JobType),

    #[error("failed to create workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("failed to remove workspace: {0}")]
    Cleanup(#[source] std::io::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to persist job: {0:#}")]
    Persist(anyhow::Error),

    #[error("failed to prepare algorithm: {0:#}")]
    Prepare(anyhow::Error),

    #[error("failed to start aggregation: {0:#}")]
    AggregationStart(anyhow::Error),

    #[error("failed to spawn algorithm: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to monitor algorithm: {0}")]
    Monitor(#[source] std::io::Error),

    #[error("execution error: algorithm exited with code {0}")]
    NonZeroExit(i32),

    #[error("algorithm was terminated by signal {0}")]
    Signaled(i32),

    #[error("execution cancelled")]
    Cancelled,

    #[error("failed to collect results: {0:#}")]
    Finalize(anyhow::Error),

    #[error("failed to notify aggregation: {0:#}")]
    AggregationNotify(anyhow::Error),

    #[error("no algorithm process is running")]
    NoActiveProcess,

    #[error("failed to signal algorithm: {0}")]
    Signal(#[source] nix::Error),

    #[error("execution task ended without a report")]
    Aborted,
}

impl ExecutionError {
    /// Status recorded on the job when this error ends a run
    pub fn terminal_status(&self) -> JobStatus {
        match self {
            ExecutionError::Cancelled => JobStatus::Cancelled,
            _ => JobStatus::Error,
        }
    }
}

/// Terminal failure of a run
///
/// Carries the status that was recorded on the job, the error that ended
/// the run and every failure raised while cleaning up after it.
#[derive(Debug)]
pub struct RunFailure {
    pub status: JobStatus,
    pub primary: ExecutionError,
    pub secondary: Vec<ExecutionError>,
}

impl RunFailure {
    pub fn new(status: JobStatus, primary: ExecutionError) -> Self {
        Self {
            status,
            primary,
            secondary: Vec::new(),
        }
    }

    /// Human-readable message stored on the job
    pub fn message(&self) -> String {
        let mut message = self.primary.to_string();
        for error in &self.secondary {
            message.push_str("; ");
            message.push_str(&error.to_string());
        }
        message
    }
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.status)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.primary)
    }
}

/// Result of one run, published exactly once
#[derive(Debug)]
pub struct ExecutionReport {
    /// Final job document
    pub job: Job,
    /// Terminal status on success, the failure otherwise
    pub outcome: Result<JobStatus, RunFailure>,
}

impl ExecutionReport {
    /// Terminal status recorded on the job
    pub fn status(&self) -> JobStatus {
        match &self.outcome {
            Ok(status) => *status,
            Err(failure) => failure.status,
        }
    }
}
