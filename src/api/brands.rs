//! Brands and pending brands API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::brand::{
        Brand, CreateBrand, CreateBrandFromPending, PendingBrand, ResolutionReport,
        ResolvePendingBrand,
    },
};

/// List all brands
#[utoipa::path(
    get,
    path = "/brands",
    tag = "brands",
    responses(
        (status = 200, description = "Brands list", body = Vec<Brand>)
    )
)]
pub async fn list_brands(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Brand>>> {
    let brands = state.services.brands.list().await?;
    Ok(Json(brands))
}

/// Create a brand
#[utoipa::path(
    post,
    path = "/brands",
    tag = "brands",
    request_body = CreateBrand,
    responses(
        (status = 201, description = "Brand created", body = Brand),
        (status = 409, description = "Name already taken")
    )
)]
pub async fn create_brand(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateBrand>,
) -> AppResult<(StatusCode, Json<Brand>)> {
    let brand = state
        .services
        .brands
        .create(&data.name, data.manufacturer.as_deref(), data.aliases.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PendingQuery {
    /// pending | validated | ignored | new_brand
    pub state: Option<String>,
}

/// List pending brands
#[utoipa::path(
    get,
    path = "/pending-brands",
    tag = "brands",
    params(PendingQuery),
    responses(
        (status = 200, description = "Pending brands", body = Vec<PendingBrand>)
    )
)]
pub async fn list_pending(
    State(state): State<crate::AppState>,
    Query(query): Query<PendingQuery>,
) -> AppResult<Json<Vec<PendingBrand>>> {
    let pending = state.services.brands.list_pending(query.state.as_deref()).await?;
    Ok(Json(pending))
}

/// Resolve a pending label onto an existing brand. The label becomes an
/// alias of the brand and the same label is auto-resolved for every other
/// provider.
#[utoipa::path(
    post,
    path = "/pending-brands/{id}/resolve",
    tag = "brands",
    params(("id" = i32, Path, description = "Pending brand ID")),
    request_body = ResolvePendingBrand,
    responses(
        (status = 200, description = "Resolution report", body = ResolutionReport)
    )
)]
pub async fn resolve_pending(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<ResolvePendingBrand>,
) -> AppResult<Json<ResolutionReport>> {
    let report = state.services.brands.resolve_pending(id, data.brand_id).await?;
    Ok(Json(report))
}

/// Create a new brand from a pending label
#[utoipa::path(
    post,
    path = "/pending-brands/{id}/create-brand",
    tag = "brands",
    params(("id" = i32, Path, description = "Pending brand ID")),
    request_body = CreateBrandFromPending,
    responses(
        (status = 201, description = "Brand created", body = Brand)
    )
)]
pub async fn create_from_pending(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<CreateBrandFromPending>,
) -> AppResult<(StatusCode, Json<Brand>)> {
    let brand = state
        .services
        .brands
        .create_brand_from_pending(id, data.name.as_deref(), data.manufacturer.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

/// Ignore a pending label (it will no longer be surfaced)
#[utoipa::path(
    post,
    path = "/pending-brands/{id}/ignore",
    tag = "brands",
    params(("id" = i32, Path, description = "Pending brand ID")),
    responses(
        (status = 200, description = "Pending brand ignored", body = PendingBrand)
    )
)]
pub async fn ignore_pending(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<PendingBrand>> {
    let pending = state.services.brands.ignore_pending(id).await?;
    Ok(Json(pending))
}

/// Re-verify all pending labels against the current brand/alias state.
/// Idempotent: a second pass with no alias changes resolves nothing.
#[utoipa::path(
    post,
    path = "/pending-brands/reverify",
    tag = "brands",
    responses(
        (status = 200, description = "Reverify report", body = ResolutionReport)
    )
)]
pub async fn reverify_pending(
    State(state): State<crate::AppState>,
) -> AppResult<Json<ResolutionReport>> {
    let report = state.services.brands.reverify_all_pending().await?;
    Ok(Json(report))
}
