//! Per-row outcomes and run summaries for the reconciliation engine

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What happened to one input row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    Created,
    Updated,
    Skipped,
    Quarantined,
    Deduped,
    Error,
}

/// Final counts of one file import. Always emitted, including when the run
/// is stopped early by the operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RunSummary {
    pub file_name: String,
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped_existing: usize,
    pub quarantined: usize,
    pub deduped: usize,
    pub errors: usize,
    pub encoding_errors: usize,
    pub new_brands: Vec<String>,
    pub stopped_early: bool,
}

impl RunSummary {
    pub fn success_rate(&self) -> f64 {
        if self.total_rows == 0 {
            return 100.0;
        }
        let ok = self.created + self.updated;
        ok as f64 * 100.0 / self.total_rows as f64
    }

    pub fn message(&self) -> String {
        format!(
            "{} rows: {} created, {} updated, {} skipped (existing), {} quarantined, {} deduped, {} errors ({:.1}% success)",
            self.total_rows,
            self.created,
            self.updated,
            self.skipped_existing,
            self.quarantined,
            self.deduped,
            self.errors,
            self.success_rate(),
        )
    }
}
