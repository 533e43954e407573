//! Plan runs repository
//!
//! Status transitions are guarded in SQL (`WHERE status = ...`) so the
//! monotonic lifecycle pending -> running -> ok|failed holds even when
//! sweeps overlap. Only the explicit reset path returns a finished run to
//! pending.

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::plan_run::{PlanRun, RunAttachment},
};

#[derive(Clone)]
pub struct RunsRepository {
    pool: Pool<Postgres>,
}

impl RunsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, provider_id: Option<i32>, limit: i64) -> AppResult<Vec<PlanRun>> {
        let rows = match provider_id {
            Some(pid) => {
                sqlx::query_as::<_, PlanRun>(
                    "SELECT * FROM plan_runs WHERE provider_id = $1 ORDER BY id DESC LIMIT $2",
                )
                .bind(pid)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PlanRun>("SELECT * FROM plan_runs ORDER BY id DESC LIMIT $1")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<PlanRun> {
        sqlx::query_as::<_, PlanRun>("SELECT * FROM plan_runs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Run {} not found", id)))
    }

    pub async fn enqueue(&self, provider_id: i32, name: &str) -> AppResult<PlanRun> {
        let row = sqlx::query_as::<_, PlanRun>(
            "INSERT INTO plan_runs (name, provider_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(provider_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Oldest pending runs, bounded batch for one sweep
    pub async fn pending_batch(&self, limit: i64) -> AppResult<Vec<PlanRun>> {
        let rows = sqlx::query_as::<_, PlanRun>(
            "SELECT * FROM plan_runs WHERE status = 'pending' ORDER BY id ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// pending -> running. Returns None when the run was already picked up
    /// by an overlapping sweep (or reset concurrently).
    pub async fn mark_running(&self, id: i32) -> AppResult<Option<PlanRun>> {
        let row = sqlx::query_as::<_, PlanRun>(
            "UPDATE plan_runs SET status = 'running', started_at = now() WHERE id = $1 AND status = 'pending' RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// running -> ok
    pub async fn mark_ok(
        &self,
        id: i32,
        files_downloaded: i32,
        files_imported: i32,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE plan_runs SET status = 'ok', ended_at = now(), files_downloaded = $2, files_imported = $3, last_error = NULL WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(files_downloaded)
        .bind(files_imported)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// running -> failed, error message preserved
    pub async fn mark_failed(&self, id: i32, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE plan_runs SET status = 'failed', ended_at = now(), last_error = $2 WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Explicit operator reset, the only path back to pending
    pub async fn reset(&self, id: i32) -> AppResult<PlanRun> {
        sqlx::query_as::<_, PlanRun>(
            r#"
            UPDATE plan_runs
            SET status = 'pending', started_at = NULL, ended_at = NULL,
                last_error = NULL, files_downloaded = 0, files_imported = 0
            WHERE id = $1 AND status IN ('ok', 'failed')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::BusinessRule(format!(
                "Run {} cannot be reset (not found or not finished)",
                id
            ))
        })
    }

    /// Append a chunk to the run's human-readable log
    pub async fn append_log(&self, id: i32, chunk: &str) -> AppResult<()> {
        sqlx::query("UPDATE plan_runs SET log = log || $2 WHERE id = $1")
            .bind(id)
            .bind(chunk)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- Attachments ----

    pub async fn attachments(&self, run_id: i32) -> AppResult<Vec<RunAttachment>> {
        let rows = sqlx::query_as::<_, RunAttachment>(
            "SELECT id, run_id, name, kind, state, mime_type, size_bytes, created_at FROM run_attachments WHERE run_id = $1 ORDER BY id",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Placeholder for a processed file (no content kept)
    pub async fn create_processed_attachment(&self, run_id: i32, name: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO run_attachments (run_id, name, kind, state) VALUES ($1, $2, 'processed', 'ready')",
        )
        .bind(run_id)
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Raw source bytes. Contended across concurrent runs; callers wrap
    /// this in the retry helper and may fall back to
    /// [`Self::create_raw_placeholder`].
    pub async fn create_raw_attachment(&self, run_id: i32, name: &str, content: &[u8]) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO run_attachments (run_id, name, kind, state, size_bytes, content) VALUES ($1, $2, 'raw', 'downloaded', $3, $4)",
        )
        .bind(run_id)
        .bind(name)
        .bind(content.len() as i64)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Raw attachment entry without the bytes (retention was skipped)
    pub async fn create_raw_placeholder(&self, run_id: i32, name: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO run_attachments (run_id, name, kind, state) VALUES ($1, $2, 'raw', 'downloaded')",
        )
        .bind(run_id)
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
