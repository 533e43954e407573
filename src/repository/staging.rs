//! Import histories and quarantine repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::staging::{ErrorLineQuery, ImportErrorLine, ImportHistory},
    models::RunSummary,
};

#[derive(Clone)]
pub struct StagingRepository {
    pool: Pool<Postgres>,
}

impl StagingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // ---- Histories ----

    pub async fn create_history(
        &self,
        run_id: Option<i32>,
        provider_id: Option<i32>,
        file_name: &str,
    ) -> AppResult<ImportHistory> {
        let row = sqlx::query_as::<_, ImportHistory>(
            "INSERT INTO import_histories (run_id, provider_id, file_name) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(run_id)
        .bind(provider_id)
        .bind(file_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Write the final counts of a finished import
    pub async fn finalize_history(&self, id: i32, summary: &RunSummary) -> AppResult<()> {
        let new_brands = if summary.new_brands.is_empty() {
            None
        } else {
            Some(summary.new_brands.join("\n"))
        };
        sqlx::query(
            r#"
            UPDATE import_histories SET
                total_rows = $2, created_count = $3, updated_count = $4,
                skipped_existing_count = $5, quarantined_count = $6,
                deduped_count = $7, error_count = $8, encoding_errors = $9,
                message = $10, new_brands = $11, finished_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(summary.total_rows as i32)
        .bind(summary.created as i32)
        .bind(summary.updated as i32)
        .bind(summary.skipped_existing as i32)
        .bind(summary.quarantined as i32)
        .bind(summary.deduped as i32)
        .bind(summary.errors as i32)
        .bind(summary.encoding_errors as i32)
        .bind(summary.message())
        .bind(new_brands)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_history(&self, id: i32) -> AppResult<ImportHistory> {
        sqlx::query_as::<_, ImportHistory>("SELECT * FROM import_histories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Import history {} not found", id)))
    }

    pub async fn list_histories(
        &self,
        provider_id: Option<i32>,
        limit: i64,
    ) -> AppResult<Vec<ImportHistory>> {
        let rows = match provider_id {
            Some(pid) => {
                sqlx::query_as::<_, ImportHistory>(
                    "SELECT * FROM import_histories WHERE provider_id = $1 ORDER BY id DESC LIMIT $2",
                )
                .bind(pid)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ImportHistory>(
                    "SELECT * FROM import_histories ORDER BY id DESC LIMIT $1",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// Histories produced for a provider since a run started, used to link
    /// run attachments
    pub async fn histories_for_run(&self, run_id: i32) -> AppResult<Vec<ImportHistory>> {
        let rows = sqlx::query_as::<_, ImportHistory>(
            "SELECT * FROM import_histories WHERE run_id = $1 ORDER BY id",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ---- Error lines (quarantine) ----

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_error_line(
        &self,
        history_id: i32,
        row_number: i32,
        ean: Option<&str>,
        reference: Option<&str>,
        product_name: Option<&str>,
        error_type: &str,
        error_details: Option<&str>,
        raw_data: Option<&serde_json::Value>,
        existing_product_id: Option<i32>,
    ) -> AppResult<i32> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO import_error_lines (
                history_id, row_number, ean, reference, product_name,
                error_type, error_details, raw_data, existing_product_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(history_id)
        .bind(row_number)
        .bind(ean)
        .bind(reference)
        .bind(product_name)
        .bind(error_type)
        .bind(error_details)
        .bind(raw_data)
        .bind(existing_product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Bump the duplicate counter of a prior error line and append the new
    /// row number to its duplicate list
    pub async fn bump_duplicate(&self, id: i32, row_number: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE import_error_lines
            SET duplicate_count = duplicate_count + 1,
                duplicate_rows = CASE
                    WHEN duplicate_rows IS NULL OR duplicate_rows = '' THEN $2::text
                    ELSE duplicate_rows || ', ' || $2::text
                END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(row_number)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_error_lines(&self, query: &ErrorLineQuery) -> AppResult<Vec<ImportErrorLine>> {
        let limit = query.limit.unwrap_or(200).clamp(1, 1000);
        let offset = query.offset.unwrap_or(0).max(0);
        let rows = sqlx::query_as::<_, ImportErrorLine>(
            r#"
            SELECT * FROM import_error_lines
            WHERE ($1::int IS NULL OR history_id = $1)
              AND ($2::text IS NULL OR error_type = $2)
              AND ($3::text IS NULL OR ean = $3)
            ORDER BY history_id DESC, row_number
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(query.history_id)
        .bind(&query.error_type)
        .bind(&query.ean)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn annotate_error_line(&self, id: i32, action_taken: &str) -> AppResult<ImportErrorLine> {
        sqlx::query_as::<_, ImportErrorLine>(
            "UPDATE import_error_lines SET action_taken = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(action_taken)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Error line {} not found", id)))
    }

    pub async fn count_error_lines(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*)::bigint FROM import_error_lines")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Bulk purge, batched on physical row position (ctid). Offset-based
    /// pagination degrades on large deletes; deleting by ctid keeps every
    /// batch O(batch) and each commit bounds lock duration. Repeats until a
    /// batch deletes fewer rows than the batch size.
    pub async fn purge_error_lines(&self, batch_size: i64) -> AppResult<(u64, u32)> {
        let mut total: u64 = 0;
        let mut batches: u32 = 0;
        loop {
            let result = sqlx::query(
                "DELETE FROM import_error_lines WHERE ctid IN (SELECT ctid FROM import_error_lines LIMIT $1)",
            )
            .bind(batch_size)
            .execute(&self.pool)
            .await?;
            let deleted = result.rows_affected();
            total += deleted;
            batches += 1;
            tracing::info!("quarantine purge: batch {} deleted {} rows", batches, deleted);
            if (deleted as i64) < batch_size {
                break;
            }
        }
        Ok((total, batches))
    }
}
