//! Repository layer for database operations

pub mod brands;
pub mod catalog;
pub mod providers;
pub mod runs;
pub mod staging;
pub mod templates;
pub mod vendor_entries;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub providers: providers::ProvidersRepository,
    pub templates: templates::TemplatesRepository,
    pub runs: runs::RunsRepository,
    pub staging: staging::StagingRepository,
    pub brands: brands::BrandsRepository,
    pub catalog: catalog::CatalogRepository,
    pub vendor_entries: vendor_entries::VendorEntriesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            providers: providers::ProvidersRepository::new(pool.clone()),
            templates: templates::TemplatesRepository::new(pool.clone()),
            runs: runs::RunsRepository::new(pool.clone()),
            staging: staging::StagingRepository::new(pool.clone()),
            brands: brands::BrandsRepository::new(pool.clone()),
            catalog: catalog::CatalogRepository::new(pool.clone()),
            vendor_entries: vendor_entries::VendorEntriesRepository::new(pool.clone()),
            pool,
        }
    }
}
