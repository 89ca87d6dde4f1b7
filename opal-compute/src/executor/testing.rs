//! Fixtures for engine and controller tests

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use opal_core::domain::job::{Job, JobParams, JobType};
use serde_json::Map;
use tempfile::TempDir;

use super::runtime::{AlgorithmRuntime, CommandSpec, PreparedRun, RuntimeRegistry};
use super::workspace::Workspace;
use super::ExecutionDeps;
use crate::config::Config;
use crate::repository::EventRecord;
use crate::repository::memory::{InMemoryEventRepository, InMemoryJobRepository, RecordingAggregation};
use crate::service::DataFetcher;

pub fn sample_job() -> Job {
    Job::new(
        JobType::Python,
        JobParams {
            algorithm_name: "density".to_string(),
            start_date: "2016-01-01T00:00:00Z".parse().unwrap(),
            end_date: "2016-01-31T23:59:59Z".parse().unwrap(),
            sampling: 1.0,
            key_selector: None,
            extra: Map::new(),
        },
    )
}

/// Runtime running a shell snippet
#[derive(Clone)]
pub struct StubRuntime {
    program: String,
    script: String,
    prepare_delay: Duration,
    fail_prepare: bool,
    fail_finalize: bool,
}

impl StubRuntime {
    pub fn script(script: &str) -> Self {
        Self {
            program: "sh".to_string(),
            script: script.to_string(),
            prepare_delay: Duration::ZERO,
            fail_prepare: false,
            fail_finalize: false,
        }
    }

    pub fn failing_prepare() -> Self {
        Self {
            fail_prepare: true,
            ..Self::script("true")
        }
    }

    /// Spends `delay` in prepare, before any process exists
    pub fn slow_prepare(delay: Duration) -> Self {
        Self {
            prepare_delay: delay,
            ..Self::script("true")
        }
    }

    pub fn missing_program() -> Self {
        Self {
            program: "/nonexistent/opal-algorithm".to_string(),
            ..Self::script("true")
        }
    }

    pub fn failing_finalize(script: &str) -> Self {
        Self {
            fail_finalize: true,
            ..Self::script(script)
        }
    }
}

#[async_trait]
impl AlgorithmRuntime for StubRuntime {
    async fn prepare(
        &self,
        _job: &Job,
        workspace: &Workspace,
        update_url: &str,
    ) -> Result<PreparedRun> {
        tokio::time::sleep(self.prepare_delay).await;
        if self.fail_prepare {
            anyhow::bail!("algorithm service unreachable");
        }
        workspace.write_file("update_url", update_url).await?;
        Ok(PreparedRun {
            reducer: "sum".to_string(),
        })
    }

    fn build_command(&self, _workspace: &Workspace) -> CommandSpec {
        CommandSpec {
            program: self.program.clone(),
            args: vec!["-c".to_string(), self.script.clone()],
            env: Vec::new(),
        }
    }

    async fn finalize(&self, _job: &mut Job, _workspace: &Workspace) -> Result<()> {
        if self.fail_finalize {
            anyhow::bail!("result file missing");
        }
        Ok(())
    }
}

/// Engine dependencies backed by in-memory stores
pub struct Harness {
    pub jobs: Arc<InMemoryJobRepository>,
    pub aggregation: RecordingAggregation,
    pub deps: ExecutionDeps,
    pub root: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_events(Vec::new())
    }

    pub fn with_events(records: Vec<EventRecord>) -> Self {
        Self::build(InMemoryEventRepository::new(records))
    }

    pub fn build(events: InMemoryEventRepository) -> Self {
        let root = tempfile::tempdir().unwrap();
        let config = Config {
            workspace_root: root.path().to_path_buf(),
            ..Config::default()
        };
        let jobs = Arc::new(InMemoryJobRepository::new());
        let aggregation = RecordingAggregation::new();

        let deps = ExecutionDeps {
            config: Arc::new(config),
            jobs: jobs.clone(),
            aggregation: Arc::new(aggregation.clone()),
            fetcher: Arc::new(DataFetcher::new(Arc::new(events), 100)),
        };

        Self {
            jobs,
            aggregation,
            deps,
            root,
        }
    }

    /// Stores a fresh job and returns it
    pub fn job(&self) -> Job {
        let job = sample_job();
        self.jobs.insert(job.clone());
        job
    }

    pub fn registry(&self, runtime: StubRuntime) -> RuntimeRegistry {
        let mut registry = RuntimeRegistry::new(self.deps.clone());
        registry.register(JobType::Python, move || Box::new(runtime.clone()));
        registry
    }

    /// Workspaces still present under the root
    pub fn workspaces(&self) -> usize {
        std::fs::read_dir(self.root.path()).unwrap().count()
    }
}
