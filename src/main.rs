//! PIM Server - Supplier Feed Import & Reconciliation
//!
//! A Rust server that reconciles heterogeneous supplier product feeds into
//! a canonical catalog.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post, put, delete},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pim_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("pim_server={},tower_http=debug", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PIM Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    let sweep_interval = Duration::from_secs(config.import.sweep_interval_secs.max(1));

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, &config).expect("Failed to create services");

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Periodic scheduler sweep: reloads pending work on startup by
    // construction (pending runs live in the database)
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_state.services.scheduler.sweep().await;
        }
    });

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Providers
        .route("/providers", get(api::providers::list_providers))
        .route("/providers", post(api::providers::create_provider))
        .route("/providers/:id", get(api::providers::get_provider))
        .route("/providers/:id", put(api::providers::update_provider))
        .route("/providers/:id/enqueue", post(api::providers::enqueue_run))
        .route("/providers/:id/run-now", post(api::providers::run_now))
        // Manual imports
        .route("/providers/:id/import", post(api::imports::upload_and_import))
        .route("/providers/:id/process-paths", post(api::imports::process_paths))
        // Mapping templates
        .route("/templates", get(api::templates::list_templates))
        .route("/templates", post(api::templates::create_template))
        .route("/templates/export", get(api::templates::export_templates))
        .route("/templates/import", post(api::templates::import_templates))
        .route("/templates/:id", get(api::templates::get_template))
        .route("/templates/:id", put(api::templates::update_template))
        .route("/templates/:id", delete(api::templates::delete_template))
        .route("/templates/:id/lines", put(api::templates::replace_lines))
        // Plan runs
        .route("/runs", get(api::runs::list_runs))
        .route("/runs/:id", get(api::runs::get_run))
        .route("/runs/:id/attachments", get(api::runs::list_attachments))
        .route("/runs/:id/reset", post(api::runs::reset_run))
        .route("/runs/:id/stop", post(api::runs::stop_run))
        // Staging / quarantine
        .route("/histories", get(api::staging::list_histories))
        .route("/staging", get(api::staging::list_error_lines))
        .route("/staging/:id/action", put(api::staging::annotate_error_line))
        .route("/staging/purge", post(api::staging::purge_quarantine))
        // Brands
        .route("/brands", get(api::brands::list_brands))
        .route("/brands", post(api::brands::create_brand))
        .route("/pending-brands", get(api::brands::list_pending))
        .route("/pending-brands/reverify", post(api::brands::reverify_pending))
        .route("/pending-brands/:id/resolve", post(api::brands::resolve_pending))
        .route("/pending-brands/:id/create-brand", post(api::brands::create_from_pending))
        .route("/pending-brands/:id/ignore", post(api::brands::ignore_pending))
        // CSV exports
        .route("/exports/barcodes.csv", get(api::exports::barcodes_csv))
        .route("/exports/providers.csv", get(api::exports::providers_csv))
        .route("/exports/brands.csv", get(api::exports::brands_csv))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
