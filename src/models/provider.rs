//! Provider model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A configured external feed source (one supplier)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Provider {
    pub id: i32,
    pub name: String,
    pub supplier_name: Option<String>,
    /// Glob matched against file names in the provider inbox
    pub file_name_pattern: String,
    /// Inbox directory override; defaults to `<inbox_root>/<name>`
    pub inbox_dir: Option<String>,
    /// CSV delimiter, 1 to 5 characters. None means sniff.
    pub csv_delimiter: Option<String>,
    pub has_header: bool,
    pub decimal_separator: String,
    pub encoding_hint: Option<String>,
    pub max_files_per_run: Option<i32>,
    pub multi_file_mode: bool,
    pub merge_key: Option<String>,
    /// JSON list of secondary feed descriptors (see [`SecondaryFeed`])
    pub secondary_file_patterns: serde_json::Value,
    pub skip_existing: bool,
    pub clear_duplicate_barcodes: bool,
    pub auto_process: bool,
    pub schedule_active: bool,
    pub schedule_pim_active: bool,
    pub schedule_level: String,
    pub mapping_template_id: Option<i32>,
    pub last_connection_status: Option<String>,
    pub last_error: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One secondary file joined onto the base feed of a multi-file provider
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SecondaryFeed {
    /// Glob matched against inbox file names (e.g. "StockFile*.txt")
    pub pattern: String,
    /// Column prefix applied to non-key columns (e.g. "stock")
    #[serde(default)]
    pub prefix: String,
    /// "fixed" (header, tab/space-delimited) or "trailing_number"
    #[serde(default = "default_parse_mode")]
    pub parse_mode: String,
    /// Column name created for trailing-number feeds (e.g. "deee_tax")
    #[serde(default)]
    pub value_column: Option<String>,
}

fn default_parse_mode() -> String {
    "fixed".to_string()
}

impl Provider {
    pub fn secondary_feeds(&self) -> Vec<SecondaryFeed> {
        serde_json::from_value(self.secondary_file_patterns.clone()).unwrap_or_default()
    }
}

/// Create provider request
#[derive(Debug, Deserialize, ToSchema, validator::Validate)]
pub struct CreateProvider {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub supplier_name: Option<String>,
    #[serde(default = "default_pattern")]
    pub file_name_pattern: String,
    pub inbox_dir: Option<String>,
    pub csv_delimiter: Option<String>,
    #[serde(default = "default_true")]
    pub has_header: bool,
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: String,
    pub encoding_hint: Option<String>,
    pub max_files_per_run: Option<i32>,
    #[serde(default)]
    pub multi_file_mode: bool,
    pub merge_key: Option<String>,
    #[serde(default)]
    pub secondary_file_patterns: Vec<SecondaryFeed>,
    #[serde(default)]
    pub skip_existing: bool,
    #[serde(default)]
    pub clear_duplicate_barcodes: bool,
    #[serde(default)]
    pub auto_process: bool,
    pub mapping_template_id: Option<i32>,
}

fn default_pattern() -> String {
    "*.csv".to_string()
}

fn default_true() -> bool {
    true
}

fn default_decimal_separator() -> String {
    ".".to_string()
}

/// Update provider request (partial)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProvider {
    pub supplier_name: Option<String>,
    pub file_name_pattern: Option<String>,
    pub inbox_dir: Option<String>,
    pub csv_delimiter: Option<String>,
    pub has_header: Option<bool>,
    pub decimal_separator: Option<String>,
    pub encoding_hint: Option<String>,
    pub max_files_per_run: Option<i32>,
    pub multi_file_mode: Option<bool>,
    pub merge_key: Option<String>,
    pub secondary_file_patterns: Option<Vec<SecondaryFeed>>,
    pub skip_existing: Option<bool>,
    pub clear_duplicate_barcodes: Option<bool>,
    pub auto_process: Option<bool>,
    pub schedule_active: Option<bool>,
    pub schedule_pim_active: Option<bool>,
    pub schedule_level: Option<String>,
    pub mapping_template_id: Option<i32>,
    pub active: Option<bool>,
}
