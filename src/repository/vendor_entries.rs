//! Vendor entries repository

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::vendor_entry::VendorEntry};

#[derive(Clone)]
pub struct VendorEntriesRepository {
    pool: Pool<Postgres>,
}

impl VendorEntriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Upsert the per-(EAN, provider) snapshot of what this supplier last
    /// said about the item
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        ean: &str,
        provider_id: i32,
        supplier_name: Option<&str>,
        quantity: f64,
        price: Option<Decimal>,
        currency: &str,
        history_id: Option<i32>,
    ) -> AppResult<VendorEntry> {
        let row = sqlx::query_as::<_, VendorEntry>(
            r#"
            INSERT INTO vendor_entries (ean, provider_id, supplier_name, quantity, price, currency, last_history_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (ean, provider_id) DO UPDATE SET
                supplier_name = EXCLUDED.supplier_name,
                quantity = EXCLUDED.quantity,
                price = EXCLUDED.price,
                currency = EXCLUDED.currency,
                last_history_id = EXCLUDED.last_history_id,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(ean)
        .bind(provider_id)
        .bind(supplier_name)
        .bind(quantity)
        .bind(price)
        .bind(currency)
        .bind(history_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_for_ean(&self, ean: &str) -> AppResult<Vec<VendorEntry>> {
        let rows = sqlx::query_as::<_, VendorEntry>(
            "SELECT * FROM vendor_entries WHERE ean = $1 ORDER BY provider_id",
        )
        .bind(ean)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
