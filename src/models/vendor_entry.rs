//! Vendor entry model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// What one supplier last said about one item, unique per (EAN, provider)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct VendorEntry {
    pub id: i32,
    pub ean: String,
    pub provider_id: i32,
    pub supplier_name: Option<String>,
    pub quantity: f64,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub currency: String,
    pub last_history_id: Option<i32>,
    pub updated_at: DateTime<Utc>,
}
