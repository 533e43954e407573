//! Mapping template models
//!
//! A template maps source feed columns to canonical product fields, with
//! optional per-line transformations. Templates are exportable/importable
//! as JSON so a working mapping can be shared across providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Mapping template header
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MappingTemplate {
    pub id: i32,
    pub name: String,
    pub provider_id: Option<i32>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line: source column -> target field, with optional transform
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MappingLine {
    pub id: i32,
    pub template_id: i32,
    pub sequence: i32,
    pub source_column: String,
    pub target_field: String,
    pub transform_type: String,
    pub transform_value: Option<String>,
    pub transform_value2: Option<String>,
    /// Other column(s) to concatenate; several may be given separated by ";"
    pub concat_column: Option<String>,
    pub concat_separator: String,
    /// If the resolved value is empty, omit the field instead of writing ""
    pub skip_if_empty: bool,
    /// If the resolved value is empty, reject the whole row
    pub required_field: bool,
    pub update_mode: String,
    pub active: bool,
    pub notes: Option<String>,
}

/// Template with its lines, as served by the API and the JSON export
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MappingTemplateFull {
    #[serde(flatten)]
    pub template: MappingTemplate,
    pub lines: Vec<MappingLine>,
}

/// Create/replace template request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMappingTemplate {
    pub name: String,
    pub provider_id: Option<i32>,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<CreateMappingLine>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateMappingLine {
    #[serde(default = "default_sequence")]
    pub sequence: i32,
    pub source_column: String,
    pub target_field: String,
    #[serde(default = "default_transform")]
    pub transform_type: String,
    pub transform_value: Option<String>,
    pub transform_value2: Option<String>,
    pub concat_column: Option<String>,
    #[serde(default = "default_separator")]
    pub concat_separator: String,
    #[serde(default = "default_true")]
    pub skip_if_empty: bool,
    #[serde(default)]
    pub required_field: bool,
    #[serde(default = "default_update_mode")]
    pub update_mode: String,
    #[serde(default = "default_true")]
    pub active: bool,
    pub notes: Option<String>,
}

fn default_sequence() -> i32 {
    10
}

fn default_transform() -> String {
    "none".to_string()
}

fn default_separator() -> String {
    " ".to_string()
}

fn default_update_mode() -> String {
    "replace".to_string()
}

fn default_true() -> bool {
    true
}

/// JSON exchange format for template export/import. `provider_name` is used
/// to re-attach the template on import when no explicit provider is given.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateExport {
    pub name: String,
    pub provider_name: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub lines: Vec<TemplateExportLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateExportLine {
    pub sequence: i32,
    pub source_column: String,
    pub target_field: String,
    pub transform_type: String,
    #[serde(default)]
    pub transform_value: String,
    #[serde(default)]
    pub transform_value2: String,
    #[serde(default)]
    pub concat_column: String,
    #[serde(default = "default_separator")]
    pub concat_separator: String,
    #[serde(default)]
    pub required_field: bool,
    #[serde(default = "default_true")]
    pub skip_if_empty: bool,
    #[serde(default = "default_update_mode")]
    pub update_mode: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub notes: String,
}

impl From<&MappingLine> for TemplateExportLine {
    fn from(line: &MappingLine) -> Self {
        Self {
            sequence: line.sequence,
            source_column: line.source_column.clone(),
            target_field: line.target_field.clone(),
            transform_type: line.transform_type.clone(),
            transform_value: line.transform_value.clone().unwrap_or_default(),
            transform_value2: line.transform_value2.clone().unwrap_or_default(),
            concat_column: line.concat_column.clone().unwrap_or_default(),
            concat_separator: line.concat_separator.clone(),
            required_field: line.required_field,
            skip_if_empty: line.skip_if_empty,
            update_mode: line.update_mode.clone(),
            active: line.active,
            notes: line.notes.clone().unwrap_or_default(),
        }
    }
}
