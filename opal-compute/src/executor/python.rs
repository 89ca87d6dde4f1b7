//! Python algorithm runtime
//!
//! Stages `algorithm.json`, `params.json` and the embedded `main.py` entry
//! point, then runs `<python> -W ignore main.py ...` inside the workspace.
//! Sandboxing itself is left to the `opalalgorithms` runner, configured
//! through the environment.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use opal_core::domain::job::Job;

use super::runtime::{AlgorithmRuntime, CommandSpec, PreparedRun};
use super::workspace::{INPUT_DIR, Workspace};
use crate::config::Config;
use crate::repository::AlgorithmRepository;

const ENTRY_POINT: &str = include_str!("../../assets/main.py");

pub struct PythonRuntime {
    config: Arc<Config>,
    algorithms: Arc<dyn AlgorithmRepository>,
}

impl PythonRuntime {
    pub fn new(config: Arc<Config>, algorithms: Arc<dyn AlgorithmRepository>) -> Self {
        Self { config, algorithms }
    }
}

#[async_trait]
impl AlgorithmRuntime for PythonRuntime {
    async fn prepare(
        &self,
        job: &Job,
        workspace: &Workspace,
        update_url: &str,
    ) -> Result<PreparedRun> {
        let algorithm = self.algorithms.retrieve(&job.params.algorithm_name).await?;

        let mut params = serde_json::to_value(&job.params)?;
        if let Some(object) = params.as_object_mut() {
            object.insert("aggregationServiceUrl".to_string(), update_url.into());
        }

        workspace
            .write_json("algorithm.json", &algorithm)
            .await
            .context("Failed to write algorithm.json")?;
        workspace
            .write_json("params.json", &params)
            .await
            .context("Failed to write params.json")?;
        workspace
            .write_file("main.py", ENTRY_POINT)
            .await
            .context("Failed to write main.py")?;

        Ok(PreparedRun {
            reducer: algorithm.reducer,
        })
    }

    fn build_command(&self, _workspace: &Workspace) -> CommandSpec {
        let args = [
            "-W",
            "ignore",
            "main.py",
            "--data_dir",
            INPUT_DIR,
            "--algorithm_json",
            "algorithm.json",
            "--params_json",
            "params.json",
        ];

        CommandSpec {
            program: self.config.python_bin.clone(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: vec![
                (
                    "OPALALGO_SANDBOX_VENV".to_string(),
                    self.config.sandbox_venv.clone(),
                ),
                (
                    "OPALALGO_SANDBOX_USER".to_string(),
                    self.config.sandbox_user.clone(),
                ),
                (
                    "OPAL_ANALYTICS_DATABASE_URL".to_string(),
                    self.config.analytics_database_url.clone(),
                ),
                (
                    "OPAL_MAX_USERS_PER_FETCH".to_string(),
                    self.config.max_users_per_fetch.to_string(),
                ),
                (
                    "OPAL_MAX_CORES".to_string(),
                    self.config.max_cores.to_string(),
                ),
            ],
        }
    }

    /// Results are streamed to the aggregation service by the algorithm
    async fn finalize(&self, _job: &mut Job, _workspace: &Workspace) -> Result<()> {
        Ok(())
    }
}
