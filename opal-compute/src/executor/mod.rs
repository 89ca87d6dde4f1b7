//! Job execution engine
//!
//! A [`JobExecutor`] owns one job document, one workspace and at most one
//! algorithm process. Phases run strictly in order:
//!
//! ```text
//! CREATED -> TRANSFERRING_DATA -> RUNNING -> SUCCESS | ERROR | CANCELLED
//! ```
//!
//! 1. record the start, create the workspace, fetch input data
//! 2. let the runtime stage the algorithm, start the aggregation session
//! 3. spawn the process and collect its output until it exits
//! 4. finalize: terminal status, workspace removal, aggregation
//!    `finish`/`cancel`, persistence
//!
//! Every failure is funneled into a single error handler. Whatever happens,
//! the run publishes exactly one [`ExecutionReport`].

mod error;
mod handle;
mod python;
mod runtime;
mod workspace;

#[cfg(test)]
pub mod testing;

pub use error::{ExecutionError, ExecutionReport, RunFailure};
pub use handle::ExecutionHandle;
pub use python::PythonRuntime;
pub use runtime::{AlgorithmRuntime, RuntimeRegistry};
pub use workspace::Workspace;

use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::sync::Arc;

use chrono::Utc;
use nix::sys::signal::Signal;
use opal_core::domain::job::{Job, JobStatus};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::repository::{AggregationService, AggregationSession, JobRepository};
use crate::service::DataFetcher;
use handle::ProcessControl;

/// Collaborators shared by every executor of the node
#[derive(Clone)]
pub struct ExecutionDeps {
    pub config: Arc<Config>,
    pub jobs: Arc<dyn JobRepository>,
    pub aggregation: Arc<dyn AggregationService>,
    pub fetcher: Arc<DataFetcher>,
}

/// State machine running one job
pub struct JobExecutor {
    job: Job,
    runtime: Box<dyn AlgorithmRuntime>,
    deps: ExecutionDeps,
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl JobExecutor {
    pub(crate) fn new(job: Job, runtime: Box<dyn AlgorithmRuntime>, deps: ExecutionDeps) -> Self {
        Self { job, runtime, deps }
    }

    /// Job document as loaded, before any execution
    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Starts the run in the background
    pub fn start_execution(self) -> ExecutionHandle {
        let control = Arc::new(ProcessControl::default());
        let (sender, receiver) = watch::channel(None);
        let handle = ExecutionHandle::new(self.job.id, control.clone(), receiver);

        tokio::spawn(async move {
            let report = self.run(&control).await;
            sender.send_replace(Some(Arc::new(report)));
        });

        handle
    }

    async fn run(mut self, control: &ProcessControl) -> ExecutionReport {
        let job_id = self.job.id;
        let session = self.deps.aggregation.session(job_id);
        let mut workspace = None;

        info!(%job_id, algorithm = %self.job.params.algorithm_name, "Starting execution");

        let outcome = match self.execute(session.as_ref(), &mut workspace, control).await {
            Ok(code) => self.finalize(code, session.as_ref(), workspace).await,
            Err(error) => Err(self
                .handle_execution_error(error, session.as_ref(), workspace)
                .await),
        };

        match &outcome {
            Ok(status) => info!(%job_id, %status, "Execution finished"),
            Err(failure) => warn!(
                %job_id,
                status = %failure.status,
                error = %failure.message(),
                "Execution failed"
            ),
        }

        ExecutionReport {
            job: self.job,
            outcome,
        }
    }

    /// Runs every phase up to the exit of the process
    ///
    /// # Returns
    /// The exit code of a process that exited on its own
    async fn execute(
        &mut self,
        session: &dyn AggregationSession,
        workspace: &mut Option<Workspace>,
        control: &ProcessControl,
    ) -> Result<i32, ExecutionError> {
        self.job.start_date = Some(Utc::now());
        self.job.end_date = None;
        self.job.stdout.clear();
        self.job.stderr.clear();
        self.job.exit_code = None;
        self.job.message = None;

        let created = Workspace::create(&self.deps.config.workspace_root)
            .await
            .map_err(ExecutionError::Workspace)?;
        let workspace = workspace.insert(created);
        debug!(job_id = %self.job.id, path = %workspace.path().display(), "Workspace created");

        self.job.push_status(JobStatus::TransferringData);
        self.persist().await?;

        self.deps
            .fetcher
            .fetch(
                self.job.params.start_date,
                self.job.params.end_date,
                self.job.params.sampling,
                &workspace.input_dir(),
            )
            .await?;

        let prepared = self
            .runtime
            .prepare(&self.job, workspace, &session.update_url())
            .await
            .map_err(ExecutionError::Prepare)?;

        session
            .start(&prepared.reducer, self.job.params.key_selector.as_ref())
            .await
            .map_err(ExecutionError::AggregationStart)?;

        self.job.push_status(JobStatus::Running);
        self.persist().await?;

        let child = self.spawn(workspace)?;
        self.monitor(child, control).await
    }

    fn spawn(&self, workspace: &Workspace) -> Result<Child, ExecutionError> {
        let spec = self.runtime.build_command(workspace);
        debug!(job_id = %self.job.id, program = %spec.program, args = ?spec.args, "Spawning algorithm");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(key, value)| (key, value)))
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        command.spawn().map_err(ExecutionError::Spawn)
    }

    /// Collects the output of `child` until it exits
    async fn monitor(
        &mut self,
        mut child: Child,
        control: &ProcessControl,
    ) -> Result<i32, ExecutionError> {
        if let Some(pid) = child.id() {
            control.attach(pid);
            info!(job_id = %self.job.id, pid, "Algorithm running");
        }

        let (sender, mut chunks) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward(stdout, Stream::Stdout, sender.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward(stderr, Stream::Stderr, sender.clone()));
        }
        drop(sender);

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut collect = |(stream, chunk): (Stream, Vec<u8>)| match stream {
            Stream::Stdout => stdout.extend_from_slice(&chunk),
            Stream::Stderr => stderr.extend_from_slice(&chunk),
        };

        let status = loop {
            tokio::select! {
                Some(chunk) = chunks.recv() => collect(chunk),
                status = child.wait() => break status,
            }
        };
        let stopped_before_exit = control.stop_requested();

        // Descendants holding the pipes keep the group alive and signalable
        while let Some(chunk) = chunks.recv().await {
            collect(chunk);
        }
        control.detach();
        drop(child);

        self.job.stdout.push_str(&String::from_utf8_lossy(&stdout));
        self.job.stderr.push_str(&String::from_utf8_lossy(&stderr));

        let status = status.map_err(ExecutionError::Monitor)?;
        debug!(job_id = %self.job.id, %status, "Algorithm exited");

        if control.stop_requested() && !stopped_before_exit {
            return Err(ExecutionError::Cancelled);
        }

        match (status.code(), status.signal()) {
            (Some(code), _) => Ok(code),
            (None, Some(signal))
                if signal == Signal::SIGTERM as i32 && control.stop_requested() =>
            {
                Err(ExecutionError::Cancelled)
            }
            (None, signal) => Err(ExecutionError::Signaled(signal.unwrap_or_default())),
        }
    }

    /// Terminal path of a process that exited on its own
    async fn finalize(
        &mut self,
        code: i32,
        session: &dyn AggregationSession,
        workspace: Option<Workspace>,
    ) -> Result<JobStatus, RunFailure> {
        let collected = match workspace.as_ref() {
            Some(ws) => self.runtime.finalize(&mut self.job, ws).await,
            None => Ok(()),
        };
        if let Err(e) = collected {
            return Err(self
                .handle_execution_error(ExecutionError::Finalize(e), session, workspace)
                .await);
        }

        let (status, primary) = match code {
            0 => (JobStatus::Success, None),
            code => (JobStatus::Error, Some(ExecutionError::NonZeroExit(code))),
        };

        self.job.push_status(status);
        self.job.exit_code = Some(code);
        self.job.end_date = Some(Utc::now());

        let mut secondary = Vec::new();
        remove_workspace(workspace, &mut secondary).await;

        let notified = match status {
            JobStatus::Success => session.finish().await,
            _ => session.cancel().await,
        };
        if let Err(e) = notified {
            secondary.push(ExecutionError::AggregationNotify(e));
        }

        let mut failure = match primary {
            Some(primary) => Some(RunFailure {
                status,
                primary,
                secondary,
            }),
            None if secondary.is_empty() => None,
            None => {
                let primary = secondary.remove(0);
                Some(RunFailure {
                    status,
                    primary,
                    secondary,
                })
            }
        };

        self.job.message = Some(match &failure {
            Some(failure) => failure.message(),
            None => "Execution completed successfully".to_string(),
        });

        if let Err(e) = self.persist().await {
            error!(job_id = %self.job.id, error = %e, "Failed to persist finalized job");
            match failure.as_mut() {
                Some(failure) => failure.secondary.push(e),
                None => failure = Some(RunFailure::new(status, e)),
            }
        }

        match failure {
            Some(failure) => Err(failure),
            None => Ok(status),
        }
    }

    /// Terminal path of every failure
    ///
    /// Never fails itself: errors raised while cleaning up are kept as
    /// secondary errors of the returned failure.
    async fn handle_execution_error(
        &mut self,
        error: ExecutionError,
        session: &dyn AggregationSession,
        workspace: Option<Workspace>,
    ) -> RunFailure {
        let status = error.terminal_status();
        error!(job_id = %self.job.id, %status, %error, "Execution error");

        let mut failure = RunFailure::new(status, error);
        self.job.push_status(status);
        self.job.exit_code = Some(1);
        self.job.end_date = Some(Utc::now());

        remove_workspace(workspace, &mut failure.secondary).await;

        if let Err(e) = session.cancel().await {
            failure.secondary.push(ExecutionError::AggregationNotify(e));
        }

        self.job.message = Some(failure.message());

        if let Err(e) = self.persist().await {
            error!(job_id = %self.job.id, error = %e, "Failed to persist failed job");
            failure.secondary.push(e);
        }

        failure
    }

    async fn persist(&self) -> Result<(), ExecutionError> {
        self.deps
            .jobs
            .update_execution(&self.job)
            .await
            .map_err(ExecutionError::Persist)
    }
}

async fn remove_workspace(workspace: Option<Workspace>, errors: &mut Vec<ExecutionError>) {
    if let Some(mut workspace) = workspace {
        if let Err(e) = workspace.remove().await {
            warn!(path = %workspace.path().display(), error = %e, "Failed to remove workspace");
            errors.push(ExecutionError::Cleanup(e));
        }
    }
}

/// Forwards raw chunks of one output stream until EOF
async fn forward<R>(mut reader: R, stream: Stream, sender: mpsc::UnboundedSender<(Stream, Vec<u8>)>)
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; 8192];
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => {
                if sender.send((stream, buffer[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read algorithm output");
                break;
            }
        }
    }
}
