//! Single-slot job controller
//!
//! Admission policy of the node: at most one job occupies the slot. The
//! slot goes `Idle -> Starting -> Running(generation) -> Idle`; a run's
//! completion watcher only releases the slot it was admitted into, so a
//! stale watcher never frees a newer run's slot.
//!
//! A failed cancel drops the reference to the run but leaves the slot
//! `Draining(generation)` until that run ends, so no second job is
//! admitted next to it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use opal_core::domain::job::Job;
use opal_core::dto::node::NodeStatusResponse;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::executor::{ExecutionError, ExecutionHandle, RuntimeRegistry};
use crate::service::StatusTracker;

/// Errors reported to callers of the controller
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("job_id is missing or is not a valid job id")]
    InvalidJobId,

    #[error("Service is not available for compute")]
    Busy,

    #[error("Failed to start job: {0}")]
    StartFailed(#[source] ExecutionError),

    #[error("Not currently running a job")]
    NotRunning,

    #[error("Failed to cancel job: {0}")]
    CancelFailed(#[source] ExecutionError),
}

enum Slot {
    Idle,
    Starting,
    Running {
        generation: u64,
        handle: ExecutionHandle,
    },
    Draining {
        generation: u64,
    },
}

/// Admits and cancels jobs on the node's single slot
#[derive(Clone)]
pub struct JobController {
    slot: Arc<Mutex<Slot>>,
    status: Arc<StatusTracker>,
    registry: Arc<RuntimeRegistry>,
    generation: Arc<AtomicU64>,
}

impl JobController {
    pub fn new(registry: RuntimeRegistry) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Idle)),
            status: Arc::new(StatusTracker::new()),
            registry: Arc::new(registry),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current busy/idle status of the node
    pub fn status(&self) -> NodeStatusResponse {
        self.status.snapshot()
    }

    /// Admits `job_id` and starts running it
    ///
    /// # Returns
    /// The job document as it was before execution
    pub async fn run(&self, job_id: Option<&str>) -> Result<Job, ControllerError> {
        let job_id = job_id
            .and_then(|id| Uuid::parse_str(id.trim()).ok())
            .ok_or(ControllerError::InvalidJobId)?;

        {
            let mut slot = self.slot.lock().unwrap();
            if !matches!(*slot, Slot::Idle) {
                return Err(ControllerError::Busy);
            }
            *slot = Slot::Starting;
        }
        self.status.mark_busy(job_id);

        // Admission completes even if the caller goes away mid-request
        let controller = self.clone();
        tokio::spawn(async move { controller.admit(job_id).await })
            .await
            .unwrap_or_else(|_| {
                self.reset_starting();
                Err(ControllerError::StartFailed(ExecutionError::Aborted))
            })
    }

    async fn admit(&self, job_id: Uuid) -> Result<Job, ControllerError> {
        let executor = match self.registry.create_from_id(job_id).await {
            Ok(executor) => executor,
            Err(e) => {
                warn!(%job_id, error = %e, "Failed to create executor");
                self.reset_starting();
                return Err(ControllerError::StartFailed(e));
            }
        };

        let job = executor.job().clone();
        let handle = executor.start_execution();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        *self.slot.lock().unwrap() = Slot::Running {
            generation,
            handle: handle.clone(),
        };
        info!(%job_id, generation, "Job admitted");

        let controller = self.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.wait().await {
                warn!(job_id = %handle.job_id(), error = %e, "Run ended without a report");
            }
            controller.release(generation);
        });

        Ok(job)
    }

    /// Cancels the job occupying the slot
    ///
    /// # Returns
    /// The finalized job document
    pub async fn cancel(&self) -> Result<Job, ControllerError> {
        let (generation, handle) = match &*self.slot.lock().unwrap() {
            Slot::Running { generation, handle } => (*generation, handle.clone()),
            _ => return Err(ControllerError::NotRunning),
        };

        info!(job_id = %handle.job_id(), "Cancelling job");
        match handle.stop_execution().await {
            Ok(report) => {
                self.release(generation);
                Ok(report.job.clone())
            }
            Err(e) => {
                warn!(job_id = %handle.job_id(), error = %e, "Failed to cancel job");
                self.clear(generation);
                Err(ControllerError::CancelFailed(e))
            }
        }
    }

    /// Frees the slot of `generation` and marks the node idle
    fn release(&self, generation: u64) {
        let mut slot = self.slot.lock().unwrap();
        match &*slot {
            Slot::Running { generation: current, .. } | Slot::Draining { generation: current }
                if *current == generation =>
            {
                *slot = Slot::Idle;
                self.status.mark_idle();
            }
            _ => {}
        }
    }

    /// Drops the handle of `generation`; the slot stays taken until the run ends
    fn clear(&self, generation: u64) {
        let mut slot = self.slot.lock().unwrap();
        if matches!(&*slot, Slot::Running { generation: current, .. } if *current == generation) {
            *slot = Slot::Draining { generation };
        }
    }

    fn reset_starting(&self) {
        let mut slot = self.slot.lock().unwrap();
        if matches!(*slot, Slot::Starting) {
            *slot = Slot::Idle;
            self.status.mark_idle();
        }
    }
}
