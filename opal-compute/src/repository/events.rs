//! Analytics event repository
//!
//! Read-only access to the event table and its antenna validity dimension.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// One event joined with the antenna record valid at its time
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct EventRecord {
    pub subject_id: String,
    pub correspondent_id: Option<String>,
    pub event_time: DateTime<Utc>,
    pub interaction: String,
    pub direction: String,
    pub call_duration: Option<i32>,
    pub antenna_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_level_1: Option<String>,
    pub location_level_2: Option<String>,
}

/// Repository trait for the analytics store
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Distinct subjects with activity in `[start, end]`, in random order
    async fn distinct_subjects(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>>;

    /// Events of `subjects` in `[start, end]`
    async fn events_for_subjects(
        &self,
        subjects: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>>;
}

/// Postgres implementation of EventRepository
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn distinct_subjects(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let subjects = sqlx::query_scalar::<_, String>(
            r#"
            SELECT subject_id
            FROM (
                SELECT DISTINCT subject_id
                FROM events
                WHERE event_time >= $1 AND event_time <= $2
            ) AS subjects
            ORDER BY random()
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(subjects)
    }

    async fn events_for_subjects(
        &self,
        subjects: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        let records = sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT e.subject_id, e.correspondent_id, e.event_time, e.interaction,
                   e.direction, e.call_duration, e.antenna_id,
                   a.latitude, a.longitude, a.location_level_1, a.location_level_2
            FROM events e
            JOIN antenna_records a
              ON a.antenna_id = e.antenna_id
             AND a.date_from <= e.event_time
             AND (a.date_to IS NULL OR e.event_time < a.date_to)
            WHERE e.subject_id = ANY($1)
              AND e.event_time >= $2 AND e.event_time <= $3
            ORDER BY e.subject_id, e.event_time
            "#,
        )
        .bind(subjects)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
