//! Catalog product model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Canonical catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    /// Primary EAN/barcode
    pub barcode: Option<String>,
    /// Supplier reference / SKU
    pub sku: Option<String>,
    pub description: Option<String>,
    pub brand_id: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub list_price: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub cost_price: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub deee_tax: Option<Decimal>,
    /// Provider that created this product on first import; never changes
    pub created_by_provider_id: Option<i32>,
    pub last_import_history_id: Option<i32>,
    pub last_import_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lookup result: the matched product plus the key that matched it,
/// kept for the audit trail
#[derive(Debug, Clone)]
pub struct ProductMatch {
    pub product: Product,
    pub matched_key: String,
}
