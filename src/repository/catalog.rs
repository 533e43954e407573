//! Catalog products repository

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::product::Product,
};

/// Field values for a product write, already widened/validated by the
/// import service
#[derive(Debug, Clone, Default)]
pub struct ProductWrite {
    pub name: String,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub brand_id: Option<i32>,
    pub list_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub deee_tax: Option<Decimal>,
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: Pool<Postgres>,
}

impl CatalogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))
    }

    /// All products whose barcode is one of `keys`. The caller decides
    /// which candidate wins and records the matched key for audit.
    pub async fn find_by_any_barcode(&self, keys: &[String]) -> AppResult<Vec<Product>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE barcode = ANY($1) ORDER BY id",
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_sku(&self, sku: &str) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE sku = $1 LIMIT 1")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Clear the barcode on every product sharing it (observed duplicate
    /// barcode policy: duplicates are wiped so uniqueness can be restored
    /// by subsequent imports)
    pub async fn clear_barcode_duplicates(&self, barcode: &str) -> AppResult<u64> {
        let result = sqlx::query("UPDATE products SET barcode = NULL, updated_at = now() WHERE barcode = $1")
            .bind(barcode)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn create(
        &self,
        write: &ProductWrite,
        provider_id: i32,
        history_id: i32,
    ) -> AppResult<Product> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                name, barcode, sku, description, brand_id,
                list_price, cost_price, deee_tax,
                created_by_provider_id, last_import_history_id, last_import_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now())
            RETURNING *
            "#,
        )
        .bind(&write.name)
        .bind(&write.barcode)
        .bind(&write.sku)
        .bind(&write.description)
        .bind(write.brand_id)
        .bind(write.list_price)
        .bind(write.cost_price)
        .bind(write.deee_tax)
        .bind(provider_id)
        .bind(history_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Full-row update; the service computed the effective values after
    /// applying per-field update policies. `created_by_provider_id` is
    /// never touched.
    pub async fn update(&self, id: i32, write: &ProductWrite, history_id: i32) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = $2, barcode = $3, sku = $4, description = $5,
                brand_id = $6, list_price = $7, cost_price = $8, deee_tax = $9,
                last_import_history_id = $10, last_import_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&write.name)
        .bind(&write.barcode)
        .bind(&write.sku)
        .bind(&write.description)
        .bind(write.brand_id)
        .bind(write.list_price)
        .bind(write.cost_price)
        .bind(write.deee_tax)
        .bind(history_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))
    }

    /// Barcode list for the administrative CSV export
    pub async fn list_barcodes(&self) -> AppResult<Vec<(String, String, Option<String>)>> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT COALESCE(barcode, ''), name, sku FROM products WHERE barcode IS NOT NULL ORDER BY barcode",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
