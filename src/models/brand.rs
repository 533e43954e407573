//! Brand and pending-brand models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Canonical brand entity. `aliases` is a comma-separated list of uppercase
/// alternate labels learned from supplier feeds.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Brand {
    pub id: i32,
    pub name: String,
    pub manufacturer: Option<String>,
    pub aliases: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Brand {
    /// Alias labels as a list, trimmed, empty entries removed
    pub fn alias_list(&self) -> Vec<String> {
        self.aliases
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

/// An unresolved free-text brand label awaiting operator decision,
/// unique per (raw_label, provider)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PendingBrand {
    pub id: i32,
    /// Label exactly as it appears in the supplier file
    pub raw_label: String,
    pub provider_id: i32,
    /// Running tally of rows seen with this label
    pub product_count: i32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Automatic suggestion, a hint only, never auto-applied
    pub suggested_brand_id: Option<i32>,
    pub validated_brand_id: Option<i32>,
    pub created_brand_id: Option<i32>,
    /// pending | validated | ignored | new_brand
    pub state: String,
    /// Up to 10 sample products {ean, reference, name}
    pub sample_products: serde_json::Value,
    pub notes: Option<String>,
}

/// Sample product attached to a pending brand
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct BrandSample {
    #[serde(default)]
    pub ean: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub name: String,
}

/// Create brand request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBrand {
    pub name: String,
    pub manufacturer: Option<String>,
    pub aliases: Option<String>,
}

/// Resolve a pending brand onto an existing brand
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolvePendingBrand {
    pub brand_id: i32,
}

/// Create a new brand from a pending label. When `name` differs from the
/// raw label, the label is kept as an alias of the new brand.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBrandFromPending {
    pub name: Option<String>,
    pub manufacturer: Option<String>,
}

/// Outcome of a resolve/reverify action
#[derive(Debug, Serialize, ToSchema)]
pub struct ResolutionReport {
    pub resolved: u32,
    /// Pending rows auto-resolved for other providers carrying the same label
    pub cross_provider_resolved: u32,
}
