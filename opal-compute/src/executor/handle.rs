//! Handle on a started execution

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use super::error::{ExecutionError, ExecutionReport};

type ReportReceiver = watch::Receiver<Option<Arc<ExecutionReport>>>;

/// Live process of a run, shared between the engine and its handles
#[derive(Debug, Default)]
pub(crate) struct ProcessControl {
    pid: Mutex<Option<u32>>,
    stop_requested: AtomicBool,
}

impl ProcessControl {
    pub(crate) fn attach(&self, pid: u32) {
        *self.pid.lock().unwrap() = Some(pid);
    }

    pub(crate) fn detach(&self) {
        self.pid.lock().unwrap().take();
    }

    fn is_attached(&self) -> bool {
        self.pid.lock().unwrap().is_some()
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Sends SIGTERM to the process group of the run
    ///
    /// The group stays attached until every process holding the output
    /// pipes is gone, so it is signaled even after its leader exited.
    fn terminate(&self) -> Result<u32, ExecutionError> {
        // Held while signaling so the run cannot detach before the flag is set
        let guard = self.pid.lock().unwrap();
        let pid = (*guard).ok_or(ExecutionError::NoActiveProcess)?;

        match kill(Pid::from_raw(-(pid as i32)), Signal::SIGTERM) {
            Ok(()) => {
                self.stop_requested.store(true, Ordering::SeqCst);
                Ok(pid)
            }
            Err(Errno::ESRCH) => Err(ExecutionError::NoActiveProcess),
            Err(e) => Err(ExecutionError::Signal(e)),
        }
    }
}

/// Handle returned by [`JobExecutor::start_execution`](super::JobExecutor::start_execution)
///
/// Cloneable; every clone observes the same single report.
#[derive(Clone)]
pub struct ExecutionHandle {
    job_id: Uuid,
    control: Arc<ProcessControl>,
    report: ReportReceiver,
}

impl ExecutionHandle {
    pub(crate) fn new(job_id: Uuid, control: Arc<ProcessControl>, report: ReportReceiver) -> Self {
        Self {
            job_id,
            control,
            report,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Whether the algorithm's process group is still attached
    pub fn has_process(&self) -> bool {
        self.control.is_attached()
    }

    /// Whether the run has published its report
    pub fn is_finished(&self) -> bool {
        self.report.borrow().is_some()
    }

    /// Resolves with the report of the run
    pub async fn wait(&self) -> Result<Arc<ExecutionReport>, ExecutionError> {
        let mut report = self.report.clone();
        let published = report
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ExecutionError::Aborted)?;

        published.as_ref().cloned().ok_or(ExecutionError::Aborted)
    }

    /// Terminates the algorithm process and resolves with the report
    ///
    /// Fails with [`ExecutionError::NoActiveProcess`] when no process is
    /// running, e.g. while data is still being fetched.
    pub async fn stop_execution(&self) -> Result<Arc<ExecutionReport>, ExecutionError> {
        let pid = self.control.terminate()?;
        info!(job_id = %self.job_id, pid, "Sent SIGTERM to algorithm");
        self.wait().await
    }
}
