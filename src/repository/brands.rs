//! Brands and pending brands repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::brand::{Brand, PendingBrand},
};

#[derive(Clone)]
pub struct BrandsRepository {
    pool: Pool<Postgres>,
}

impl BrandsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // ---- Brands ----

    pub async fn list(&self) -> AppResult<Vec<Brand>> {
        let rows = sqlx::query_as::<_, Brand>("SELECT * FROM brands ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Brand> {
        sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Brand {} not found", id)))
    }

    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Brand>> {
        let row = sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE name ILIKE $1 LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create(
        &self,
        name: &str,
        manufacturer: Option<&str>,
        aliases: Option<&str>,
    ) -> AppResult<Brand> {
        let row = sqlx::query_as::<_, Brand>(
            "INSERT INTO brands (name, manufacturer, aliases) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(manufacturer)
        .bind(aliases)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Overwrite a brand's alias list and record where the new alias came
    /// from in the alias history
    pub async fn set_aliases(
        &self,
        brand_id: i32,
        aliases: &str,
        new_alias: &str,
        provider_id: Option<i32>,
        source: &str,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE brands SET aliases = $2, updated_at = now() WHERE id = $1")
            .bind(brand_id)
            .bind(aliases)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO brand_alias_history (brand_id, alias, provider_id, source) VALUES ($1, $2, $3, $4)",
        )
        .bind(brand_id)
        .bind(new_alias)
        .bind(provider_id)
        .bind(source)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    // ---- Pending brands ----

    pub async fn list_pending(&self, state: Option<&str>) -> AppResult<Vec<PendingBrand>> {
        let rows = match state {
            Some(state) => {
                sqlx::query_as::<_, PendingBrand>(
                    "SELECT * FROM pending_brands WHERE state = $1 ORDER BY last_seen DESC, raw_label",
                )
                .bind(state)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PendingBrand>(
                    "SELECT * FROM pending_brands ORDER BY last_seen DESC, raw_label",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    pub async fn get_pending(&self, id: i32) -> AppResult<PendingBrand> {
        sqlx::query_as::<_, PendingBrand>("SELECT * FROM pending_brands WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pending brand {} not found", id)))
    }

    /// Create or bump the (raw_label, provider) pending pair. The tally and
    /// last_seen move on every sighting; state and suggestion are only set
    /// on first insert.
    pub async fn upsert_pending(
        &self,
        raw_label: &str,
        provider_id: i32,
        product_count: i32,
        suggested_brand_id: Option<i32>,
        samples: &serde_json::Value,
    ) -> AppResult<PendingBrand> {
        let row = sqlx::query_as::<_, PendingBrand>(
            r#"
            INSERT INTO pending_brands (raw_label, provider_id, product_count, suggested_brand_id, sample_products)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (raw_label, provider_id) DO UPDATE SET
                product_count = pending_brands.product_count + EXCLUDED.product_count,
                last_seen = now()
            RETURNING *
            "#,
        )
        .bind(raw_label)
        .bind(provider_id)
        .bind(product_count)
        .bind(suggested_brand_id)
        .bind(samples)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Merge new samples into a pending row (bounded upstream to 10)
    pub async fn set_pending_samples(&self, id: i32, samples: &serde_json::Value) -> AppResult<()> {
        sqlx::query("UPDATE pending_brands SET sample_products = $2 WHERE id = $1")
            .bind(id)
            .bind(samples)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_pending_state(
        &self,
        id: i32,
        state: &str,
        validated_brand_id: Option<i32>,
        created_brand_id: Option<i32>,
    ) -> AppResult<PendingBrand> {
        sqlx::query_as::<_, PendingBrand>(
            r#"
            UPDATE pending_brands
            SET state = $2,
                validated_brand_id = COALESCE($3, validated_brand_id),
                created_brand_id = COALESCE($4, created_brand_id)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(state)
        .bind(validated_brand_id)
        .bind(created_brand_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pending brand {} not found", id)))
    }

    /// Cross-provider propagation: validate every still-pending row among
    /// `ids` onto `brand_id` as one statement, so a resolution is a single
    /// logical step and concurrent resolutions cannot interleave partially.
    pub async fn validate_pending_bulk(&self, ids: &[i32], brand_id: i32) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE pending_brands SET state = 'validated', validated_brand_id = $1 WHERE id = ANY($2) AND state = 'pending'",
        )
        .bind(brand_id)
        .bind(ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
