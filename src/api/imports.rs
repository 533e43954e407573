//! Manual import API endpoints (file upload and ad-hoc path processing)

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::plan_run::PlanRun,
    models::RunSummary,
    services::CancelFlag,
};

/// Upload one file and import it synchronously for a provider. The file
/// goes through the exact pipeline scheduled runs use (template check,
/// decode, merge-free path, reconciliation).
#[utoipa::path(
    post,
    path = "/providers/{id}/import",
    tag = "imports",
    params(("id" = i32, Path, description = "Provider ID")),
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Import summary", body = RunSummary),
        (status = 422, description = "No mapping template or empty feed")
    )
)]
pub async fn upload_and_import(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> AppResult<Json<RunSummary>> {
    let provider = state.services.providers.get_by_id(id).await?;

    let mut file_name = String::from("upload.csv");
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() == Some("file") {
            if let Some(name) = field.file_name() {
                file_name = name.to_string();
            }
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Cannot read upload: {}", e)))?;
            bytes = Some(data.to_vec());
        }
    }

    let bytes = bytes.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;
    let cancel = CancelFlag::new();
    let summary = state
        .services
        .import
        .import_bytes(&provider, &file_name, &bytes, None, &cancel)
        .await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessPathsRequest {
    /// Inbox file names to process, as returned by the transfer layer
    pub paths: Vec<String>,
}

/// Process explicitly selected inbox files for a provider
#[utoipa::path(
    post,
    path = "/providers/{id}/process-paths",
    tag = "imports",
    params(("id" = i32, Path, description = "Provider ID")),
    request_body = ProcessPathsRequest,
    responses(
        (status = 200, description = "Run covering the selected files", body = PlanRun)
    )
)]
pub async fn process_paths(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<ProcessPathsRequest>,
) -> AppResult<Json<PlanRun>> {
    if data.paths.is_empty() {
        return Err(AppError::BadRequest("No paths given".to_string()));
    }
    let run = state.services.scheduler.process_paths(id, &data.paths).await?;
    Ok(Json(run))
}
