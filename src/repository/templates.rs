//! Mapping templates repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::mapping_template::{CreateMappingLine, CreateMappingTemplate, MappingLine, MappingTemplate},
};

#[derive(Clone)]
pub struct TemplatesRepository {
    pool: Pool<Postgres>,
}

impl TemplatesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, provider_id: Option<i32>) -> AppResult<Vec<MappingTemplate>> {
        let rows = match provider_id {
            Some(pid) => {
                sqlx::query_as::<_, MappingTemplate>(
                    "SELECT * FROM mapping_templates WHERE provider_id = $1 ORDER BY name",
                )
                .bind(pid)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, MappingTemplate>("SELECT * FROM mapping_templates ORDER BY name")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<MappingTemplate> {
        sqlx::query_as::<_, MappingTemplate>("SELECT * FROM mapping_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Mapping template {} not found", id)))
    }

    pub async fn lines(&self, template_id: i32) -> AppResult<Vec<MappingLine>> {
        let rows = sqlx::query_as::<_, MappingLine>(
            "SELECT * FROM mapping_lines WHERE template_id = $1 ORDER BY sequence, id",
        )
        .bind(template_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Create a template with its lines in one transaction
    pub async fn create(&self, data: &CreateMappingTemplate) -> AppResult<MappingTemplate> {
        let mut tx = self.pool.begin().await?;

        let template = sqlx::query_as::<_, MappingTemplate>(
            "INSERT INTO mapping_templates (name, provider_id, notes) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&data.name)
        .bind(data.provider_id)
        .bind(&data.notes)
        .fetch_one(&mut *tx)
        .await?;

        for line in &data.lines {
            insert_line(&mut tx, template.id, line).await?;
        }

        tx.commit().await?;
        Ok(template)
    }

    /// Replace a template's lines (full rewrite, transactional)
    pub async fn replace_lines(&self, template_id: i32, lines: &[CreateMappingLine]) -> AppResult<()> {
        // Fail early with a proper 404
        self.get_by_id(template_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM mapping_lines WHERE template_id = $1")
            .bind(template_id)
            .execute(&mut *tx)
            .await?;
        for line in lines {
            insert_line(&mut tx, template_id, line).await?;
        }
        sqlx::query("UPDATE mapping_templates SET updated_at = now() WHERE id = $1")
            .bind(template_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn update_header(
        &self,
        id: i32,
        name: Option<&str>,
        notes: Option<&str>,
        active: Option<bool>,
    ) -> AppResult<MappingTemplate> {
        let current = self.get_by_id(id).await?;
        let row = sqlx::query_as::<_, MappingTemplate>(
            "UPDATE mapping_templates SET name = $2, notes = $3, active = $4, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(name.unwrap_or(&current.name))
        .bind(notes.or(current.notes.as_deref()))
        .bind(active.unwrap_or(current.active))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM mapping_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Mapping template {} not found", id)));
        }
        Ok(())
    }

    /// Find a provider's template by name, used by the JSON import to
    /// re-attach shared templates
    pub async fn find_provider_by_name(&self, name: &str) -> AppResult<Option<i32>> {
        let id: Option<i32> =
            sqlx::query_scalar("SELECT id FROM providers WHERE name ILIKE $1 LIMIT 1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id)
    }
}

async fn insert_line(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    template_id: i32,
    line: &CreateMappingLine,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO mapping_lines (
            template_id, sequence, source_column, target_field, transform_type,
            transform_value, transform_value2, concat_column, concat_separator,
            skip_if_empty, required_field, update_mode, active, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(template_id)
    .bind(line.sequence)
    .bind(&line.source_column)
    .bind(&line.target_field)
    .bind(&line.transform_type)
    .bind(&line.transform_value)
    .bind(&line.transform_value2)
    .bind(&line.concat_column)
    .bind(&line.concat_separator)
    .bind(line.skip_if_empty)
    .bind(line.required_field)
    .bind(&line.update_mode)
    .bind(line.active)
    .bind(&line.notes)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
