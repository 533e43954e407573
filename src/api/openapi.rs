//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::health::health_check,
        crate::api::health::readiness_check,
        crate::api::providers::list_providers,
        crate::api::providers::get_provider,
        crate::api::providers::create_provider,
        crate::api::providers::update_provider,
        crate::api::providers::enqueue_run,
        crate::api::providers::run_now,
        crate::api::templates::list_templates,
        crate::api::templates::get_template,
        crate::api::templates::create_template,
        crate::api::templates::update_template,
        crate::api::templates::replace_lines,
        crate::api::templates::delete_template,
        crate::api::templates::export_templates,
        crate::api::templates::import_templates,
        crate::api::runs::list_runs,
        crate::api::runs::get_run,
        crate::api::runs::list_attachments,
        crate::api::runs::reset_run,
        crate::api::runs::stop_run,
        crate::api::imports::upload_and_import,
        crate::api::imports::process_paths,
        crate::api::staging::list_histories,
        crate::api::staging::list_error_lines,
        crate::api::staging::annotate_error_line,
        crate::api::staging::purge_quarantine,
        crate::api::brands::list_brands,
        crate::api::brands::create_brand,
        crate::api::brands::list_pending,
        crate::api::brands::resolve_pending,
        crate::api::brands::create_from_pending,
        crate::api::brands::ignore_pending,
        crate::api::brands::reverify_pending,
        crate::api::exports::barcodes_csv,
        crate::api::exports::providers_csv,
        crate::api::exports::brands_csv,
    ),
    components(schemas(
        crate::error::ErrorResponse,
        models::provider::Provider,
        models::provider::CreateProvider,
        models::provider::UpdateProvider,
        models::provider::SecondaryFeed,
        models::mapping_template::MappingTemplate,
        models::mapping_template::MappingLine,
        models::mapping_template::MappingTemplateFull,
        models::mapping_template::CreateMappingTemplate,
        models::mapping_template::CreateMappingLine,
        models::mapping_template::TemplateExport,
        models::mapping_template::TemplateExportLine,
        models::plan_run::PlanRun,
        models::plan_run::RunAttachment,
        models::staging::ImportHistory,
        models::staging::ImportErrorLine,
        models::staging::AnnotateErrorLine,
        models::staging::PurgeResult,
        models::brand::Brand,
        models::brand::PendingBrand,
        models::brand::BrandSample,
        models::brand::CreateBrand,
        models::brand::ResolvePendingBrand,
        models::brand::CreateBrandFromPending,
        models::brand::ResolutionReport,
        models::product::Product,
        models::vendor_entry::VendorEntry,
        models::import_report::RunSummary,
        models::import_report::RowOutcome,
    )),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "providers", description = "Supplier feed sources"),
        (name = "templates", description = "Column mapping templates"),
        (name = "runs", description = "Plan run scheduling"),
        (name = "imports", description = "Manual imports"),
        (name = "staging", description = "Quarantine and import histories"),
        (name = "brands", description = "Brand alias resolution"),
        (name = "exports", description = "Administrative CSV exports"),
    ),
    info(
        title = "PIM Server API",
        description = "Supplier feed import and catalog reconciliation",
    )
)]
pub struct ApiDoc;

/// Swagger UI router serving the generated OpenAPI document
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
