//! Algorithm runtimes
//!
//! A runtime specializes the engine for one job type: it stages the
//! algorithm into the workspace, names the command to run and collects
//! results once the process exits. The registry maps each job type to a
//! runtime constructor.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use opal_core::domain::job::{Job, JobType};
use tracing::debug;
use uuid::Uuid;

use super::error::ExecutionError;
use super::workspace::Workspace;
use super::{ExecutionDeps, JobExecutor};

/// What the engine needs from a prepared workspace
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRun {
    /// Aggregation method the session is started with
    pub reducer: String,
}

/// Command line of the algorithm process
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

/// Job-type specific part of the engine
#[async_trait]
pub trait AlgorithmRuntime: Send + Sync {
    /// Stages the algorithm, its parameters and entry point
    ///
    /// # Arguments
    /// * `update_url` - Where the algorithm posts partial results
    async fn prepare(&self, job: &Job, workspace: &Workspace, update_url: &str)
    -> Result<PreparedRun>;

    /// Command run with the workspace as working directory
    fn build_command(&self, workspace: &Workspace) -> CommandSpec;

    /// Collects results after a completed process
    async fn finalize(&self, job: &mut Job, workspace: &Workspace) -> Result<()>;
}

type RuntimeFactory = Arc<dyn Fn() -> Box<dyn AlgorithmRuntime> + Send + Sync>;

/// Builds executors for the job types this node runs
pub struct RuntimeRegistry {
    deps: ExecutionDeps,
    factories: HashMap<JobType, RuntimeFactory>,
}

impl RuntimeRegistry {
    pub fn new(deps: ExecutionDeps) -> Self {
        Self {
            deps,
            factories: HashMap::new(),
        }
    }

    /// Registers the runtime constructor of `job_type`
    pub fn register<F>(&mut self, job_type: JobType, factory: F)
    where
        F: Fn() -> Box<dyn AlgorithmRuntime> + Send + Sync + 'static,
    {
        self.factories.insert(job_type, Arc::new(factory));
    }

    /// Loads `job_id` and binds it to a new executor
    pub async fn create_from_id(&self, job_id: Uuid) -> Result<JobExecutor, ExecutionError> {
        let job = self
            .deps
            .jobs
            .find_by_id(job_id)
            .await
            .map_err(ExecutionError::Load)?
            .ok_or(ExecutionError::JobNotFound(job_id))?;

        if !self.deps.config.accepts(job.job_type) {
            return Err(ExecutionError::UnsupportedJobType(job.job_type));
        }

        let factory = self
            .factories
            .get(&job.job_type)
            .ok_or(ExecutionError::UnsupportedJobType(job.job_type))?;

        debug!(%job_id, job_type = %job.job_type, "Creating executor");
        Ok(JobExecutor::new(job, factory(), self.deps.clone()))
    }
}
