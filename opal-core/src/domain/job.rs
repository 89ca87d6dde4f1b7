//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// Job document
///
/// Created by an external submitter with a single `Created` status entry,
/// then mutated exclusively by the compute node executing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Status history, oldest first. Entries are only ever appended.
    pub status: Vec<StatusEntry>,
    pub params: JobParams,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub message: Option<String>,
}

impl Job {
    /// Creates a fresh job document with a `Created` status entry
    pub fn new(job_type: JobType, params: JobParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type,
            status: vec![StatusEntry::now(JobStatus::Created)],
            params,
            start_date: None,
            end_date: None,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            message: None,
        }
    }

    /// Most recent status, if any
    pub fn current_status(&self) -> Option<JobStatus> {
        self.status.last().map(|entry| entry.status)
    }

    /// Appends a status entry stamped with the current time
    pub fn push_status(&mut self, status: JobStatus) {
        self.status.push(StatusEntry::now(status));
    }

    /// Number of terminal entries in the history
    pub fn terminal_count(&self) -> usize {
        self.status
            .iter()
            .filter(|entry| entry.status.is_terminal())
            .count()
    }
}

/// One entry of a job's status history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: JobStatus,
    pub at: DateTime<Utc>,
}

impl StatusEntry {
    pub fn now(status: JobStatus) -> Self {
        Self {
            status,
            at: Utc::now(),
        }
    }
}

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Created,
    TransferringData,
    Running,
    Success,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Error | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Created => write!(f, "CREATED"),
            JobStatus::TransferringData => write!(f, "TRANSFERRING_DATA"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Success => write!(f, "SUCCESS"),
            JobStatus::Error => write!(f, "ERROR"),
            JobStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Kind of algorithm a job runs
///
/// Closed set; the compute node maps each tag to a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Python,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::Python => write!(f, "python"),
        }
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" => Ok(JobType::Python),
            other => Err(format!("unknown job type '{}'", other)),
        }
    }
}

/// Job parameters
///
/// The engine reads the named fields; everything else is carried through
/// untouched to the algorithm's parameter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobParams {
    pub algorithm_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Fraction of the population to sample, in `[0, 1]`
    #[serde(default = "default_sampling")]
    pub sampling: f64,
    #[serde(default)]
    pub key_selector: Option<JsonValue>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_sampling() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> JobParams {
        JobParams {
            algorithm_name: "density".to_string(),
            start_date: "2016-01-01T00:00:00Z".parse().unwrap(),
            end_date: "2016-12-31T00:00:00Z".parse().unwrap(),
            sampling: 0.5,
            key_selector: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_new_job_starts_created() {
        let job = Job::new(JobType::Python, params());
        assert_eq!(job.current_status(), Some(JobStatus::Created));
        assert_eq!(job.terminal_count(), 0);
    }

    #[test]
    fn test_push_status_appends() {
        let mut job = Job::new(JobType::Python, params());
        job.push_status(JobStatus::TransferringData);
        job.push_status(JobStatus::Success);

        assert_eq!(job.status.len(), 3);
        assert_eq!(job.status[0].status, JobStatus::Created);
        assert_eq!(job.current_status(), Some(JobStatus::Success));
        assert_eq!(job.terminal_count(), 1);
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_value(JobStatus::TransferringData).unwrap();
        assert_eq!(json, serde_json::json!("TRANSFERRING_DATA"));
    }

    #[test]
    fn test_params_keep_unknown_fields() {
        let json = serde_json::json!({
            "algorithmName": "density",
            "startDate": "2016-01-01T00:00:00Z",
            "endDate": "2016-12-31T00:00:00Z",
            "resolution": "location_level_1",
            "keySelector": null
        });

        let params: JobParams = serde_json::from_value(json).unwrap();
        assert_eq!(params.sampling, 1.0);
        assert_eq!(
            params.extra.get("resolution"),
            Some(&serde_json::json!("location_level_1"))
        );

        let back = serde_json::to_value(&params).unwrap();
        assert_eq!(back["resolution"], "location_level_1");
        assert_eq!(back["algorithmName"], "density");
    }

    #[test]
    fn test_job_type_from_str() {
        assert_eq!(" Python ".parse::<JobType>(), Ok(JobType::Python));
        assert!("ruby".parse::<JobType>().is_err());
    }
}
