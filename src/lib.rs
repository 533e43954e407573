//! PIM Server - Supplier Feed Import & Reconciliation
//!
//! A Rust server that ingests heterogeneous supplier product feeds
//! (CSV/fixed-format files) and reconciles them into a canonical product
//! catalog, with a durable run scheduler, a quarantine area for rows that
//! cannot be committed cleanly, and a self-healing brand alias table.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
