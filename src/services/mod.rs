//! Business logic services

pub mod brands;
pub mod exports;
pub mod import;
pub mod providers;
pub mod retry;
pub mod scheduler;
pub mod templates;
pub mod transfer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Cooperative cancellation flag, polled once per row by the import loop.
/// There is no hard timeout: a run that never observes the flag runs to
/// completion.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub providers: providers::ProvidersService,
    pub templates: templates::TemplatesService,
    pub brands: brands::BrandsService,
    pub import: import::ImportService,
    pub scheduler: scheduler::SchedulerService,
    pub exports: exports::ExportsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let brands = brands::BrandsService::new(repository.clone());
        let import = import::ImportService::new(
            repository.clone(),
            brands.clone(),
            config.import.progress_every_rows,
        );
        let source = Arc::new(transfer::DirFeedSource::new(&config.import.inbox_root));
        let scheduler = scheduler::SchedulerService::new(
            repository.clone(),
            import.clone(),
            source,
            config.import.sweep_batch_size,
            retry::RetryPolicy::new(config.retry.max_attempts, config.retry.base_delay_ms, true),
        );

        Ok(Self {
            providers: providers::ProvidersService::new(repository.clone()),
            templates: templates::TemplatesService::new(repository.clone()),
            brands,
            import,
            scheduler,
            exports: exports::ExportsService::new(repository.clone()),
            repository,
        })
    }
}
