//! Providers repository

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::provider::{CreateProvider, Provider, UpdateProvider},
};

#[derive(Clone)]
pub struct ProvidersRepository {
    pool: Pool<Postgres>,
}

impl ProvidersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List providers, optionally restricted to active ones
    pub async fn list(&self, only_active: bool) -> AppResult<Vec<Provider>> {
        let rows = if only_active {
            sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE active ORDER BY name")
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as::<_, Provider>("SELECT * FROM providers ORDER BY name")
                .fetch_all(&self.pool)
                .await?
        };
        Ok(rows)
    }

    /// Providers eligible for the automatic sweep enqueue
    pub async fn list_auto_process(&self) -> AppResult<Vec<Provider>> {
        let rows = sqlx::query_as::<_, Provider>(
            "SELECT * FROM providers WHERE active AND auto_process AND schedule_active ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Provider> {
        sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Provider {} not found", id)))
    }

    pub async fn create(&self, data: &CreateProvider) -> AppResult<Provider> {
        let secondary = serde_json::to_value(&data.secondary_file_patterns)
            .map_err(|e| AppError::BadRequest(format!("Invalid secondary file patterns: {}", e)))?;
        let row = sqlx::query_as::<_, Provider>(
            r#"
            INSERT INTO providers (
                name, supplier_name, file_name_pattern, inbox_dir, csv_delimiter,
                has_header, decimal_separator, encoding_hint, max_files_per_run,
                multi_file_mode, merge_key, secondary_file_patterns,
                skip_existing, clear_duplicate_barcodes, auto_process,
                mapping_template_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.supplier_name)
        .bind(&data.file_name_pattern)
        .bind(&data.inbox_dir)
        .bind(&data.csv_delimiter)
        .bind(data.has_header)
        .bind(&data.decimal_separator)
        .bind(&data.encoding_hint)
        .bind(data.max_files_per_run)
        .bind(data.multi_file_mode)
        .bind(&data.merge_key)
        .bind(secondary)
        .bind(data.skip_existing)
        .bind(data.clear_duplicate_barcodes)
        .bind(data.auto_process)
        .bind(data.mapping_template_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Partial update; only provided fields are written
    pub async fn update(&self, id: i32, data: &UpdateProvider) -> AppResult<Provider> {
        let current = self.get_by_id(id).await?;
        let secondary = match &data.secondary_file_patterns {
            Some(feeds) => serde_json::to_value(feeds)
                .map_err(|e| AppError::BadRequest(format!("Invalid secondary file patterns: {}", e)))?,
            None => current.secondary_file_patterns.clone(),
        };

        let row = sqlx::query_as::<_, Provider>(
            r#"
            UPDATE providers SET
                supplier_name = $2,
                file_name_pattern = $3,
                inbox_dir = $4,
                csv_delimiter = $5,
                has_header = $6,
                decimal_separator = $7,
                encoding_hint = $8,
                max_files_per_run = $9,
                multi_file_mode = $10,
                merge_key = $11,
                secondary_file_patterns = $12,
                skip_existing = $13,
                clear_duplicate_barcodes = $14,
                auto_process = $15,
                schedule_active = $16,
                schedule_pim_active = $17,
                schedule_level = $18,
                mapping_template_id = $19,
                active = $20,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.supplier_name.as_ref().or(current.supplier_name.as_ref()))
        .bind(data.file_name_pattern.as_ref().unwrap_or(&current.file_name_pattern))
        .bind(data.inbox_dir.as_ref().or(current.inbox_dir.as_ref()))
        .bind(data.csv_delimiter.as_ref().or(current.csv_delimiter.as_ref()))
        .bind(data.has_header.unwrap_or(current.has_header))
        .bind(data.decimal_separator.as_ref().unwrap_or(&current.decimal_separator))
        .bind(data.encoding_hint.as_ref().or(current.encoding_hint.as_ref()))
        .bind(data.max_files_per_run.or(current.max_files_per_run))
        .bind(data.multi_file_mode.unwrap_or(current.multi_file_mode))
        .bind(data.merge_key.as_ref().or(current.merge_key.as_ref()))
        .bind(secondary)
        .bind(data.skip_existing.unwrap_or(current.skip_existing))
        .bind(
            data.clear_duplicate_barcodes
                .unwrap_or(current.clear_duplicate_barcodes),
        )
        .bind(data.auto_process.unwrap_or(current.auto_process))
        .bind(data.schedule_active.unwrap_or(current.schedule_active))
        .bind(data.schedule_pim_active.unwrap_or(current.schedule_pim_active))
        .bind(data.schedule_level.as_ref().unwrap_or(&current.schedule_level))
        .bind(data.mapping_template_id.or(current.mapping_template_id))
        .bind(data.active.unwrap_or(current.active))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Record the outcome of a connection/processing attempt
    pub async fn set_connection_status(
        &self,
        id: i32,
        status: &str,
        error: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE providers SET last_connection_status = $2, last_error = $3, last_run_at = $4, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
