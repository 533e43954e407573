//! Import history and quarantine models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Summary record of one file import (counts + message)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ImportHistory {
    pub id: i32,
    pub run_id: Option<i32>,
    pub provider_id: Option<i32>,
    pub file_name: String,
    pub total_rows: i32,
    pub created_count: i32,
    pub updated_count: i32,
    pub skipped_existing_count: i32,
    pub quarantined_count: i32,
    pub deduped_count: i32,
    pub error_count: i32,
    pub encoding_errors: i32,
    pub message: Option<String>,
    /// Names of brands first seen during this import, one per line
    pub new_brands: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// One input row that could not be committed cleanly. Read-only after the
/// run, except for the operator `action_taken` annotation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ImportErrorLine {
    pub id: i32,
    pub history_id: i32,
    pub row_number: i32,
    pub ean: Option<String>,
    pub reference: Option<String>,
    pub product_name: Option<String>,
    pub error_type: String,
    pub error_details: Option<String>,
    /// Original row content, preserved verbatim for diagnosis
    pub raw_data: Option<serde_json::Value>,
    pub duplicate_count: i32,
    pub duplicate_rows: Option<String>,
    pub existing_product_id: Option<i32>,
    /// none | quarantine | skipped | corrected
    pub action_taken: String,
    pub created_at: DateTime<Utc>,
}

/// Filters for listing quarantine lines
#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ErrorLineQuery {
    pub history_id: Option<i32>,
    pub error_type: Option<String>,
    pub ean: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Operator annotation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnnotateErrorLine {
    /// none | quarantine | skipped | corrected
    pub action_taken: String,
}

/// Result of a bulk purge
#[derive(Debug, Serialize, ToSchema)]
pub struct PurgeResult {
    pub deleted: u64,
    pub batches: u32,
}
