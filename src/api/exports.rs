//! CSV export API endpoints

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
};

use crate::error::AppResult;

fn csv_headers(file_name: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers
}

/// Barcode list export
#[utoipa::path(
    get,
    path = "/exports/barcodes.csv",
    tag = "exports",
    responses(
        (status = 200, description = "CSV content", content_type = "text/csv")
    )
)]
pub async fn barcodes_csv(State(state): State<crate::AppState>) -> AppResult<(HeaderMap, String)> {
    let csv = state.services.exports.barcodes_csv().await?;
    Ok((csv_headers("barcodes.csv"), csv))
}

/// Provider configuration export
#[utoipa::path(
    get,
    path = "/exports/providers.csv",
    tag = "exports",
    responses(
        (status = 200, description = "CSV content", content_type = "text/csv")
    )
)]
pub async fn providers_csv(State(state): State<crate::AppState>) -> AppResult<(HeaderMap, String)> {
    let csv = state.services.exports.providers_csv().await?;
    Ok((csv_headers("providers.csv"), csv))
}

/// Brand + alias table export
#[utoipa::path(
    get,
    path = "/exports/brands.csv",
    tag = "exports",
    responses(
        (status = 200, description = "CSV content", content_type = "text/csv")
    )
)]
pub async fn brands_csv(State(state): State<crate::AppState>) -> AppResult<(HeaderMap, String)> {
    let csv = state.services.exports.brands_csv().await?;
    Ok((csv_headers("brands.csv"), csv))
}
