//! In-memory repositories for tests

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opal_core::domain::job::Job;
use opal_core::dto::algorithm::AlgorithmDefinition;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::{
    AggregationService, AggregationSession, AlgorithmRepository, EventRecord, EventRepository,
    JobRepository,
};

// =============================================================================
// Jobs
// =============================================================================

/// Job store keeping every persisted snapshot
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<HashMap<Uuid, Job>>,
    snapshots: Mutex<Vec<Job>>,
    fail_updates: AtomicBool,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    /// Every document passed to `update_execution`, oldest first
    pub fn snapshots(&self) -> Vec<Job> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.get(id))
    }

    async fn update_execution(&self, job: &Job) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            anyhow::bail!("document store unavailable");
        }
        self.snapshots.lock().unwrap().push(job.clone());
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        Ok(())
    }
}

// =============================================================================
// Events
// =============================================================================

/// Event store returning subjects in insertion order
#[derive(Default)]
pub struct InMemoryEventRepository {
    records: Vec<EventRecord>,
    fail_subjects: bool,
    fail_events: bool,
    chunks: Mutex<Vec<usize>>,
    observed: Option<PathBuf>,
    files_seen: Mutex<Vec<usize>>,
}

impl InMemoryEventRepository {
    pub fn new(records: Vec<EventRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn failing_subjects() -> Self {
        Self {
            fail_subjects: true,
            ..Default::default()
        }
    }

    pub fn failing_events(records: Vec<EventRecord>) -> Self {
        Self {
            records,
            fail_events: true,
            ..Default::default()
        }
    }

    /// Counts the entries of `dir` on every `events_for_subjects` call
    pub fn observing(mut self, dir: &Path) -> Self {
        self.observed = Some(dir.to_path_buf());
        self
    }

    /// Sizes of the subject lists passed to `events_for_subjects`
    pub fn chunks(&self) -> Vec<usize> {
        self.chunks.lock().unwrap().clone()
    }

    /// Entries of the observed directory seen by each data query
    pub fn files_seen(&self) -> Vec<usize> {
        self.files_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn distinct_subjects(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        if self.fail_subjects {
            anyhow::bail!("connection refused");
        }

        let mut seen = HashSet::new();
        Ok(self
            .records
            .iter()
            .filter(|r| r.event_time >= start && r.event_time <= end)
            .filter(|r| seen.insert(r.subject_id.clone()))
            .map(|r| r.subject_id.clone())
            .collect())
    }

    async fn events_for_subjects(
        &self,
        subjects: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        self.chunks.lock().unwrap().push(subjects.len());
        if let Some(dir) = &self.observed {
            let seen = std::fs::read_dir(dir)?.count();
            self.files_seen.lock().unwrap().push(seen);
        }
        if self.fail_events {
            anyhow::bail!("relation \"antenna_records\" does not exist");
        }

        Ok(self
            .records
            .iter()
            .filter(|r| subjects.contains(&r.subject_id))
            .filter(|r| r.event_time >= start && r.event_time <= end)
            .cloned()
            .collect())
    }
}

/// Builds an event of `subject` at `at` (RFC 3339)
pub fn event(subject: &str, correspondent: Option<&str>, at: &str) -> EventRecord {
    EventRecord {
        subject_id: subject.to_string(),
        correspondent_id: correspondent.map(str::to_string),
        event_time: at.parse().unwrap(),
        interaction: "call".to_string(),
        direction: "out".to_string(),
        call_duration: Some(42),
        antenna_id: "A1".to_string(),
        latitude: Some(5.35),
        longitude: Some(-4.02),
        location_level_1: Some("  Abidjan ".to_string()),
        location_level_2: Some("Plateau\t".to_string()),
    }
}

// =============================================================================
// Algorithms
// =============================================================================

/// Algorithm service serving fixed definitions
#[derive(Default)]
pub struct StaticAlgorithms {
    algorithms: HashMap<String, AlgorithmDefinition>,
}

impl StaticAlgorithms {
    pub fn with(name: &str, reducer: &str) -> Self {
        let definition = serde_json::from_value(serde_json::json!({
            "code": "cHJpbnQoKQ==",
            "className": "Density",
            "reducer": reducer
        }))
        .unwrap();

        Self {
            algorithms: HashMap::from([(name.to_string(), definition)]),
        }
    }
}

#[async_trait]
impl AlgorithmRepository for StaticAlgorithms {
    async fn retrieve(&self, algorithm_name: &str) -> Result<AlgorithmDefinition> {
        self.algorithms
            .get(algorithm_name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("API error (status 404): unknown algorithm"))
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Aggregation service recording every call that reaches the network
#[derive(Clone, Default)]
pub struct RecordingAggregation {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<&'static str>>>,
}

impl RecordingAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `event` ("start", "finish" or "cancel") fail
    pub fn fail(&self, event: &'static str) {
        self.failing.lock().unwrap().insert(event);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.calls().iter().filter(|c| *c == event).count()
    }

    fn call(&self, event: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(event.to_string());
        if self.failing.lock().unwrap().contains(event) {
            anyhow::bail!("aggregation {} rejected", event);
        }
        Ok(())
    }
}

impl AggregationService for RecordingAggregation {
    fn session(&self, job_id: Uuid) -> Box<dyn AggregationSession> {
        Box::new(RecordingSession {
            recorder: self.clone(),
            job_id,
            active: AtomicBool::new(false),
        })
    }
}

struct RecordingSession {
    recorder: RecordingAggregation,
    job_id: Uuid,
    active: AtomicBool,
}

impl RecordingSession {
    fn terminate(&self, event: &'static str) -> Result<()> {
        if !self.active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.recorder.call(event)
    }
}

#[async_trait]
impl AggregationSession for RecordingSession {
    async fn start(
        &self,
        _aggregation_method: &str,
        _key_selector: Option<&JsonValue>,
    ) -> Result<()> {
        self.recorder.call("start")?;
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn update_url(&self) -> String {
        format!("http://aggregation.test/update/{}", self.job_id)
    }

    async fn finish(&self) -> Result<()> {
        self.terminate("finish")
    }

    async fn cancel(&self) -> Result<()> {
        self.terminate("cancel")
    }
}
