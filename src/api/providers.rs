//! Providers API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::plan_run::PlanRun,
    models::provider::{CreateProvider, Provider, UpdateProvider},
};

/// Query parameters for listing providers
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ProvidersQuery {
    /// Restrict to active providers (default: false)
    pub only_active: Option<bool>,
}

/// List providers
#[utoipa::path(
    get,
    path = "/providers",
    tag = "providers",
    params(ProvidersQuery),
    responses(
        (status = 200, description = "Providers list", body = Vec<Provider>)
    )
)]
pub async fn list_providers(
    State(state): State<crate::AppState>,
    Query(query): Query<ProvidersQuery>,
) -> AppResult<Json<Vec<Provider>>> {
    let providers = state
        .services
        .providers
        .list(query.only_active.unwrap_or(false))
        .await?;
    Ok(Json(providers))
}

/// Get provider by ID
#[utoipa::path(
    get,
    path = "/providers/{id}",
    tag = "providers",
    params(("id" = i32, Path, description = "Provider ID")),
    responses(
        (status = 200, description = "Provider details", body = Provider)
    )
)]
pub async fn get_provider(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Provider>> {
    let provider = state.services.providers.get_by_id(id).await?;
    Ok(Json(provider))
}

/// Create a provider
#[utoipa::path(
    post,
    path = "/providers",
    tag = "providers",
    request_body = CreateProvider,
    responses(
        (status = 201, description = "Provider created", body = Provider)
    )
)]
pub async fn create_provider(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateProvider>,
) -> AppResult<(StatusCode, Json<Provider>)> {
    let provider = state.services.providers.create(&data).await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

/// Update a provider (partial)
#[utoipa::path(
    put,
    path = "/providers/{id}",
    tag = "providers",
    params(("id" = i32, Path, description = "Provider ID")),
    request_body = UpdateProvider,
    responses(
        (status = 200, description = "Provider updated", body = Provider)
    )
)]
pub async fn update_provider(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<UpdateProvider>,
) -> AppResult<Json<Provider>> {
    let provider = state.services.providers.update(id, &data).await?;
    Ok(Json(provider))
}

/// Queue a plan run for this provider
#[utoipa::path(
    post,
    path = "/providers/{id}/enqueue",
    tag = "providers",
    params(("id" = i32, Path, description = "Provider ID")),
    responses(
        (status = 201, description = "Run queued", body = PlanRun)
    )
)]
pub async fn enqueue_run(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<PlanRun>)> {
    let run = state.services.scheduler.enqueue(id).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

/// Execute a run for this provider immediately (synchronous, bypasses the
/// sweep)
#[utoipa::path(
    post,
    path = "/providers/{id}/run-now",
    tag = "providers",
    params(("id" = i32, Path, description = "Provider ID")),
    responses(
        (status = 200, description = "Run executed", body = PlanRun)
    )
)]
pub async fn run_now(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<PlanRun>> {
    let run = state.services.scheduler.run_now(id).await?;
    Ok(Json(run))
}
