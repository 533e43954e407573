//! Plan runs API endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::plan_run::{PlanRun, RunAttachment},
};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RunsQuery {
    pub provider_id: Option<i32>,
    /// Default 50, max 500
    pub limit: Option<i64>,
}

/// List plan runs, newest first
#[utoipa::path(
    get,
    path = "/runs",
    tag = "runs",
    params(RunsQuery),
    responses(
        (status = 200, description = "Runs list", body = Vec<PlanRun>)
    )
)]
pub async fn list_runs(
    State(state): State<crate::AppState>,
    Query(query): Query<RunsQuery>,
) -> AppResult<Json<Vec<PlanRun>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let runs = state.services.scheduler.list_runs(query.provider_id, limit).await?;
    Ok(Json(runs))
}

/// Get run by ID
#[utoipa::path(
    get,
    path = "/runs/{id}",
    tag = "runs",
    params(("id" = i32, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run details", body = PlanRun)
    )
)]
pub async fn get_run(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<PlanRun>> {
    let run = state.services.scheduler.get_run(id).await?;
    Ok(Json(run))
}

/// List a run's attachments
#[utoipa::path(
    get,
    path = "/runs/{id}/attachments",
    tag = "runs",
    params(("id" = i32, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Attachments", body = Vec<RunAttachment>)
    )
)]
pub async fn list_attachments(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<RunAttachment>>> {
    let attachments = state.services.scheduler.attachments(id).await?;
    Ok(Json(attachments))
}

/// Reset a finished run back to pending (explicit operator action)
#[utoipa::path(
    post,
    path = "/runs/{id}/reset",
    tag = "runs",
    params(("id" = i32, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run reset", body = PlanRun),
        (status = 422, description = "Run is not finished")
    )
)]
pub async fn reset_run(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<PlanRun>> {
    let run = state.services.scheduler.reset_run(id).await?;
    Ok(Json(run))
}

/// Raise the cooperative stop flag of a running run
#[utoipa::path(
    post,
    path = "/runs/{id}/stop",
    tag = "runs",
    params(("id" = i32, Path, description = "Run ID")),
    responses(
        (status = 204, description = "Stop requested"),
        (status = 422, description = "Run is not running")
    )
)]
pub async fn stop_run(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<axum::http::StatusCode> {
    state.services.scheduler.stop_run(id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
