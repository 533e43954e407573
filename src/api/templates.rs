//! Mapping templates API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::mapping_template::{
        CreateMappingLine, CreateMappingTemplate, MappingTemplate, MappingTemplateFull,
        TemplateExport,
    },
};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct TemplatesQuery {
    pub provider_id: Option<i32>,
}

/// List mapping templates
#[utoipa::path(
    get,
    path = "/templates",
    tag = "templates",
    params(TemplatesQuery),
    responses(
        (status = 200, description = "Templates list", body = Vec<MappingTemplate>)
    )
)]
pub async fn list_templates(
    State(state): State<crate::AppState>,
    Query(query): Query<TemplatesQuery>,
) -> AppResult<Json<Vec<MappingTemplate>>> {
    let templates = state.services.templates.list(query.provider_id).await?;
    Ok(Json(templates))
}

/// Get a template with its lines
#[utoipa::path(
    get,
    path = "/templates/{id}",
    tag = "templates",
    params(("id" = i32, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template with lines", body = MappingTemplateFull)
    )
)]
pub async fn get_template(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<MappingTemplateFull>> {
    let template = state.services.templates.get_full(id).await?;
    Ok(Json(template))
}

/// Create a template with its lines
#[utoipa::path(
    post,
    path = "/templates",
    tag = "templates",
    request_body = CreateMappingTemplate,
    responses(
        (status = 201, description = "Template created", body = MappingTemplateFull)
    )
)]
pub async fn create_template(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateMappingTemplate>,
) -> AppResult<(StatusCode, Json<MappingTemplateFull>)> {
    let template = state.services.templates.create(&data).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTemplateHeader {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub active: Option<bool>,
}

/// Update a template's header fields
#[utoipa::path(
    put,
    path = "/templates/{id}",
    tag = "templates",
    params(("id" = i32, Path, description = "Template ID")),
    request_body = UpdateTemplateHeader,
    responses(
        (status = 200, description = "Template updated", body = MappingTemplate)
    )
)]
pub async fn update_template(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<UpdateTemplateHeader>,
) -> AppResult<Json<MappingTemplate>> {
    let template = state
        .services
        .templates
        .update_header(id, data.name.as_deref(), data.notes.as_deref(), data.active)
        .await?;
    Ok(Json(template))
}

/// Replace a template's lines
#[utoipa::path(
    put,
    path = "/templates/{id}/lines",
    tag = "templates",
    params(("id" = i32, Path, description = "Template ID")),
    request_body = Vec<CreateMappingLine>,
    responses(
        (status = 200, description = "Lines replaced", body = MappingTemplateFull)
    )
)]
pub async fn replace_lines(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(lines): Json<Vec<CreateMappingLine>>,
) -> AppResult<Json<MappingTemplateFull>> {
    let template = state.services.templates.replace_lines(id, &lines).await?;
    Ok(Json(template))
}

/// Delete a template
#[utoipa::path(
    delete,
    path = "/templates/{id}",
    tag = "templates",
    params(("id" = i32, Path, description = "Template ID")),
    responses(
        (status = 204, description = "Template deleted")
    )
)]
pub async fn delete_template(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.templates.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ExportQuery {
    /// Comma-separated template IDs; all templates when omitted
    pub ids: Option<String>,
}

/// Export templates as shareable JSON
#[utoipa::path(
    get,
    path = "/templates/export",
    tag = "templates",
    params(ExportQuery),
    responses(
        (status = 200, description = "Template export payload", body = Vec<TemplateExport>)
    )
)]
pub async fn export_templates(
    State(state): State<crate::AppState>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Json<Vec<TemplateExport>>> {
    let ids: Option<Vec<i32>> = query
        .ids
        .as_deref()
        .map(|raw| raw.split(',').filter_map(|s| s.trim().parse().ok()).collect());
    let exports = state.services.templates.export_json(ids.as_deref()).await?;
    Ok(Json(exports))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ImportQuery {
    /// Attach all imported templates to this provider
    pub provider_id: Option<i32>,
}

/// Import templates from a JSON export payload
#[utoipa::path(
    post,
    path = "/templates/import",
    tag = "templates",
    params(ImportQuery),
    request_body = Vec<TemplateExport>,
    responses(
        (status = 201, description = "IDs of created templates", body = Vec<i32>)
    )
)]
pub async fn import_templates(
    State(state): State<crate::AppState>,
    Query(query): Query<ImportQuery>,
    Json(payload): Json<Vec<TemplateExport>>,
) -> AppResult<(StatusCode, Json<Vec<i32>>)> {
    let created = state
        .services
        .templates
        .import_json(&payload, query.provider_id)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
