//! Pseudonymizing data fetcher
//!
//! Extracts a sampled, pseudonymized slice of the analytics store into one
//! CSV file per subject:
//! 1. list the subjects active in the window, in random order
//! 2. keep the first `floor(count * sampling)` of them
//! 3. load their events in chunks, hashing every identifier with one salt
//! 4. write `<dir>/<pseudonym>.csv` per subject
//!
//! The salt never leaves [`DataFetcher::fetch`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::repository::{EventRecord, EventRepository};
use crate::service::pseudonym::{generate_salt, pseudonymize};

/// Errors produced while fetching input data
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("sampling fraction must be within [0, 1], got {0}")]
    InvalidSampling(f64),

    #[error("failed to create data directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("users query failed: {0:#}")]
    UsersQuery(anyhow::Error),

    #[error("data query failed: {0:#}")]
    DataQuery(anyhow::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Number of subjects sampled out of `population` with fraction `sampling`
pub fn sample_size(population: usize, sampling: f64) -> Result<usize, FetchError> {
    if !(0.0..=1.0).contains(&sampling) {
        return Err(FetchError::InvalidSampling(sampling));
    }
    Ok((population as f64 * sampling).floor() as usize)
}

/// One line of a subject file, in column order
#[derive(Debug, Serialize)]
struct SubjectRow {
    interaction: String,
    direction: String,
    correspondent_id: String,
    datetime: String,
    call_duration: Option<i32>,
    antenna_id: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    location_level_1: String,
    location_level_2: String,
}

impl SubjectRow {
    fn from_record(record: EventRecord, salt: &str) -> Self {
        let correspondent_id = match record.correspondent_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => pseudonymize(raw, salt),
            _ => String::new(),
        };

        Self {
            interaction: record.interaction,
            direction: record.direction,
            correspondent_id,
            datetime: record.event_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            call_duration: record.call_duration,
            antenna_id: record.antenna_id,
            latitude: record.latitude,
            longitude: record.longitude,
            location_level_1: trimmed(record.location_level_1),
            location_level_2: trimmed(record.location_level_2),
        }
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Fetches pseudonymized per-subject input files
pub struct DataFetcher {
    events: Arc<dyn EventRepository>,
    max_users_per_fetch: usize,
}

impl DataFetcher {
    pub fn new(events: Arc<dyn EventRepository>, max_users_per_fetch: usize) -> Self {
        Self {
            events,
            max_users_per_fetch: max_users_per_fetch.max(1),
        }
    }

    /// Writes the sampled population of `[start, end]` into `dir`
    ///
    /// # Returns
    /// `dir`, once every subject file has been written
    pub async fn fetch(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sampling: f64,
        dir: &Path,
    ) -> Result<PathBuf, FetchError> {
        if !(0.0..=1.0).contains(&sampling) {
            return Err(FetchError::InvalidSampling(sampling));
        }

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| FetchError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;

        let mut subjects = self
            .events
            .distinct_subjects(start, end)
            .await
            .map_err(FetchError::UsersQuery)?;

        let population = subjects.len();
        subjects.truncate(sample_size(population, sampling)?);
        debug!(population, sampled = subjects.len(), "Sampled population");

        let salt = generate_salt();
        let mut files = 0;

        // Subjects never span chunks: each chunk is written before the next query
        for chunk in subjects.chunks(self.max_users_per_fetch) {
            let records = self
                .events
                .events_for_subjects(chunk, start, end)
                .await
                .map_err(FetchError::DataQuery)?;

            let mut groups: BTreeMap<String, Vec<SubjectRow>> = BTreeMap::new();
            for record in records {
                let pseudonym = pseudonymize(&record.subject_id, &salt);
                groups
                    .entry(pseudonym)
                    .or_default()
                    .push(SubjectRow::from_record(record, &salt));
            }

            files += groups.len();
            let target = dir.to_path_buf();
            tokio::task::spawn_blocking(move || write_groups(&target, groups))
                .await
                .map_err(|e| FetchError::Write {
                    path: dir.to_path_buf(),
                    source: std::io::Error::other(e).into(),
                })??;
        }
        drop(salt);

        info!(dir = %dir.display(), files, "Input data written");
        Ok(dir.to_path_buf())
    }
}

fn write_groups(dir: &Path, groups: BTreeMap<String, Vec<SubjectRow>>) -> Result<(), FetchError> {
    for (pseudonym, rows) in groups {
        let path = dir.join(format!("{}.csv", pseudonym));
        write_subject(&path, &rows).map_err(|source| FetchError::Write { path, source })?;
    }
    Ok(())
}

fn write_subject(path: &Path, rows: &[SubjectRow]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
