//! Health check endpoints

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::AppResult;

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check (verifies database connectivity)
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready"),
        (status = 500, description = "Database unreachable")
    )
)]
pub async fn readiness_check(State(state): State<crate::AppState>) -> AppResult<Json<Value>> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.services.repository.pool)
        .await?;
    Ok(Json(json!({ "status": "ready" })))
}
