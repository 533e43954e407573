//! Shared domain enums
//!
//! Statuses are stored as plain text columns; these enums carry the
//! canonical labels and parsing for the service layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Plan run lifecycle. Transitions are monotonic:
/// pending -> running -> ok | failed. Only an explicit operator reset may
/// return a finished run to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Ok,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Ok => "ok",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "ok" => Some(RunStatus::Ok),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// Kind of file kept on a plan run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Raw,
    Processed,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Raw => "raw",
            AttachmentKind::Processed => "processed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentState {
    Downloaded,
    Ready,
    Imported,
    Error,
}

impl AttachmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentState::Downloaded => "downloaded",
            AttachmentState::Ready => "ready",
            AttachmentState::Imported => "imported",
            AttachmentState::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Quarantine error lines
// ---------------------------------------------------------------------------

/// Classification of a row that did not commit cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorLineType {
    SkippedExisting,
    NoKey,
    DuplicateKeyInFile,
    DuplicateReference,
    DedupedIdentical,
    NoBrand,
    MissingRequiredField,
    TechnicalError,
    Other,
}

impl ErrorLineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorLineType::SkippedExisting => "skipped_existing",
            ErrorLineType::NoKey => "no_key",
            ErrorLineType::DuplicateKeyInFile => "duplicate_key_in_file",
            ErrorLineType::DuplicateReference => "duplicate_reference",
            ErrorLineType::DedupedIdentical => "deduped_identical",
            ErrorLineType::NoBrand => "no_brand",
            ErrorLineType::MissingRequiredField => "missing_required_field",
            ErrorLineType::TechnicalError => "technical_error",
            ErrorLineType::Other => "other",
        }
    }
}

// ---------------------------------------------------------------------------
// Pending brands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PendingBrandState {
    Pending,
    Validated,
    Ignored,
    NewBrand,
}

impl PendingBrandState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingBrandState::Pending => "pending",
            PendingBrandState::Validated => "validated",
            PendingBrandState::Ignored => "ignored",
            PendingBrandState::NewBrand => "new_brand",
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping lines
// ---------------------------------------------------------------------------

/// Transformation applied to a source value before it reaches the target
/// field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransformType {
    #[default]
    None,
    Strip,
    Upper,
    Lower,
    Replace,
    Literal,
    DefaultIfEmpty,
    Divide,
    Multiply,
    Concat,
}

impl TransformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformType::None => "none",
            TransformType::Strip => "strip",
            TransformType::Upper => "upper",
            TransformType::Lower => "lower",
            TransformType::Replace => "replace",
            TransformType::Literal => "literal",
            TransformType::DefaultIfEmpty => "default_if_empty",
            TransformType::Divide => "divide",
            TransformType::Multiply => "multiply",
            TransformType::Concat => "concat",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "strip" => TransformType::Strip,
            "upper" => TransformType::Upper,
            "lower" => TransformType::Lower,
            "replace" => TransformType::Replace,
            "literal" => TransformType::Literal,
            "default_if_empty" => TransformType::DefaultIfEmpty,
            "divide" => TransformType::Divide,
            "multiply" => TransformType::Multiply,
            "concat" => TransformType::Concat,
            _ => TransformType::None,
        }
    }
}

/// How a mapped field is written onto an existing product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    #[default]
    Replace,
    FillIfEmpty,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Replace => "replace",
            UpdateMode::FillIfEmpty => "fill_if_empty",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "fill_if_empty" => UpdateMode::FillIfEmpty,
            _ => UpdateMode::Replace,
        }
    }
}
