//! Quarantine (staging) API endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::staging::{AnnotateErrorLine, ErrorLineQuery, ImportErrorLine, ImportHistory, PurgeResult},
};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct HistoriesQuery {
    pub provider_id: Option<i32>,
    pub limit: Option<i64>,
}

/// List import histories, newest first
#[utoipa::path(
    get,
    path = "/histories",
    tag = "staging",
    params(HistoriesQuery),
    responses(
        (status = 200, description = "Import histories", body = Vec<ImportHistory>)
    )
)]
pub async fn list_histories(
    State(state): State<crate::AppState>,
    Query(query): Query<HistoriesQuery>,
) -> AppResult<Json<Vec<ImportHistory>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let histories = state
        .services
        .repository
        .staging
        .list_histories(query.provider_id, limit)
        .await?;
    Ok(Json(histories))
}

/// List quarantined rows with their original raw content
#[utoipa::path(
    get,
    path = "/staging",
    tag = "staging",
    params(ErrorLineQuery),
    responses(
        (status = 200, description = "Quarantine lines", body = Vec<ImportErrorLine>)
    )
)]
pub async fn list_error_lines(
    State(state): State<crate::AppState>,
    Query(query): Query<ErrorLineQuery>,
) -> AppResult<Json<Vec<ImportErrorLine>>> {
    let lines = state.services.repository.staging.list_error_lines(&query).await?;
    Ok(Json(lines))
}

/// Annotate a quarantine line with the action taken by the operator
#[utoipa::path(
    put,
    path = "/staging/{id}/action",
    tag = "staging",
    params(("id" = i32, Path, description = "Error line ID")),
    request_body = AnnotateErrorLine,
    responses(
        (status = 200, description = "Line annotated", body = ImportErrorLine)
    )
)]
pub async fn annotate_error_line(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<AnnotateErrorLine>,
) -> AppResult<Json<ImportErrorLine>> {
    const ACTIONS: &[&str] = &["none", "quarantine", "skipped", "corrected"];
    if !ACTIONS.contains(&data.action_taken.as_str()) {
        return Err(AppError::Validation(format!(
            "Unknown action '{}'",
            data.action_taken
        )));
    }
    let line = state
        .services
        .repository
        .staging
        .annotate_error_line(id, &data.action_taken)
        .await?;
    Ok(Json(line))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PurgeRequest {
    /// Must be true; guards against accidental purges
    pub confirm: bool,
}

/// Bulk purge of the whole quarantine table, batched by physical row
/// position
#[utoipa::path(
    post,
    path = "/staging/purge",
    tag = "staging",
    request_body = PurgeRequest,
    responses(
        (status = 200, description = "Purge result", body = PurgeResult),
        (status = 400, description = "Confirmation missing")
    )
)]
pub async fn purge_quarantine(
    State(state): State<crate::AppState>,
    Json(data): Json<PurgeRequest>,
) -> AppResult<Json<PurgeResult>> {
    if !data.confirm {
        return Err(AppError::BadRequest(
            "Set confirm=true to purge the quarantine".to_string(),
        ));
    }
    let batch = state.config.import.purge_batch_size;
    let (deleted, batches) = state.services.repository.staging.purge_error_lines(batch).await?;
    tracing::info!("quarantine purged: {} row(s) in {} batch(es)", deleted, batches);
    Ok(Json(PurgeResult { deleted, batches }))
}
