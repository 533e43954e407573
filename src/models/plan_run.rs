//! Plan run models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// One scheduled/triggered execution of the import pipeline for one provider
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PlanRun {
    pub id: i32,
    pub name: String,
    pub provider_id: i32,
    /// pending | running | ok | failed
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub files_downloaded: i32,
    pub files_imported: i32,
    /// Append-only human-readable log
    pub log: String,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PlanRun {
    pub fn duration_seconds(&self) -> f64 {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds().max(0) as f64 / 1000.0,
            _ => 0.0,
        }
    }
}

/// A file kept on a plan run, raw source bytes or processed result
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RunAttachment {
    pub id: i32,
    pub run_id: i32,
    pub name: String,
    /// raw | processed
    pub kind: String,
    /// downloaded | ready | imported | error
    pub state: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}
