//! Plan run scheduler
//!
//! A durable queue of plan runs (one per provider, one execution) processed
//! by a periodic sweep with bounded batch size. Each run is executed
//! synchronously within the sweep; an exception during one run marks that
//! run failed and the sweep continues, so no pending work is silently
//! dropped. Raw-file retention is best-effort behind a lock-retry policy;
//! processed-import correctness is not.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    ingest::FeedMerger,
    models::{PlanRun, Provider, RunAttachment, RunSummary},
    repository::Repository,
    services::import::ImportService,
    services::retry::RetryPolicy,
    services::transfer::{all_matches, newest_match, FeedSource},
    services::CancelFlag,
};

#[derive(Clone)]
pub struct SchedulerService {
    repository: Repository,
    import: ImportService,
    source: Arc<dyn FeedSource>,
    sweep_batch_size: i64,
    attachment_retry: RetryPolicy,
    /// Cooperative stop flags of currently-running runs
    running: Arc<Mutex<HashMap<i32, CancelFlag>>>,
}

impl SchedulerService {
    pub fn new(
        repository: Repository,
        import: ImportService,
        source: Arc<dyn FeedSource>,
        sweep_batch_size: i64,
        attachment_retry: RetryPolicy,
    ) -> Self {
        Self {
            repository,
            import,
            source,
            sweep_batch_size,
            attachment_retry,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn list_runs(&self, provider_id: Option<i32>, limit: i64) -> AppResult<Vec<PlanRun>> {
        self.repository.runs.list(provider_id, limit).await
    }

    pub async fn get_run(&self, id: i32) -> AppResult<PlanRun> {
        self.repository.runs.get_by_id(id).await
    }

    pub async fn attachments(&self, run_id: i32) -> AppResult<Vec<RunAttachment>> {
        self.repository.runs.get_by_id(run_id).await?;
        self.repository.runs.attachments(run_id).await
    }

    /// Queue one run for a provider
    pub async fn enqueue(&self, provider_id: i32) -> AppResult<PlanRun> {
        let provider = self.repository.providers.get_by_id(provider_id).await?;
        let name = format!("Run {} - {}", provider.name, Utc::now().format("%Y-%m-%d %H:%M"));
        self.repository.runs.enqueue(provider.id, &name).await
    }

    /// Enqueue + immediate synchronous execution, bypassing the sweep
    pub async fn run_now(&self, provider_id: i32) -> AppResult<PlanRun> {
        let run = self.enqueue(provider_id).await?;
        self.execute_run(&run).await;
        self.repository.runs.get_by_id(run.id).await
    }

    /// Operator reset: the only path returning a finished run to pending
    pub async fn reset_run(&self, run_id: i32) -> AppResult<PlanRun> {
        self.repository.runs.reset(run_id).await
    }

    /// Ad-hoc processing of explicitly selected inbox files, wrapped in a
    /// run record like any other execution
    pub async fn process_paths(&self, provider_id: i32, paths: &[String]) -> AppResult<PlanRun> {
        let provider = self.repository.providers.get_by_id(provider_id).await?;
        let name = format!(
            "Ad-hoc {} - {}",
            provider.name,
            Utc::now().format("%Y-%m-%d %H:%M")
        );
        let run = self.repository.runs.enqueue(provider.id, &name).await?;
        let claimed = self
            .repository
            .runs
            .mark_running(run.id)
            .await?
            .ok_or_else(|| AppError::Internal("run vanished before execution".to_string()))?;

        let cancel = CancelFlag::new();
        let mut imported = 0i32;
        let mut downloaded = 0i32;
        let mut failure: Option<AppError> = None;

        for path in paths {
            match self.source.fetch(&provider, path).await {
                Ok(bytes) => {
                    downloaded += 1;
                    self.keep_raw_attachment(claimed.id, path, &bytes).await;
                    match self
                        .import
                        .import_bytes(&provider, path, &bytes, Some(claimed.id), &cancel)
                        .await
                    {
                        Ok(summary) => {
                            imported += 1;
                            self.repository
                                .runs
                                .create_processed_attachment(claimed.id, path)
                                .await?;
                            self.append_log(claimed.id, &format!("{}\n", summary.message())).await;
                        }
                        Err(e) => {
                            self.append_log(claimed.id, &format!("{}: {}\n", path, e)).await;
                            failure = Some(e);
                            break;
                        }
                    }
                }
                Err(e) => {
                    self.append_log(claimed.id, &format!("{}: {}\n", path, e)).await;
                    failure = Some(e);
                    break;
                }
            }
        }

        match failure {
            None => self.repository.runs.mark_ok(claimed.id, downloaded, imported).await?,
            Some(e) => {
                self.repository.runs.mark_failed(claimed.id, &e.to_string()).await?;
            }
        }
        self.repository.runs.get_by_id(claimed.id).await
    }

    /// Raise the cooperative stop flag of a running run
    pub async fn stop_run(&self, run_id: i32) -> AppResult<()> {
        let flags = self.running.lock().map_err(|_| AppError::Internal("flag registry poisoned".into()))?;
        match flags.get(&run_id) {
            Some(flag) => {
                flag.cancel();
                Ok(())
            }
            None => Err(AppError::BusinessRule(format!("Run {} is not running", run_id))),
        }
    }

    /// One periodic sweep: enqueue auto-process providers that are due,
    /// then execute a bounded batch of pending runs oldest-first.
    pub async fn sweep(&self) {
        if let Err(e) = self.enqueue_auto_providers().await {
            tracing::warn!("sweep: auto-enqueue failed: {}", e);
        }

        let runs = match self.repository.runs.pending_batch(self.sweep_batch_size).await {
            Ok(runs) => runs,
            Err(e) => {
                tracing::error!("sweep: cannot fetch pending runs: {}", e);
                return;
            }
        };
        if runs.is_empty() {
            return;
        }
        tracing::info!("sweep: picked {} pending run(s)", runs.len());

        let mut ok = 0usize;
        let mut failed = 0usize;
        for run in &runs {
            // execute_run records failure on the run itself; the sweep
            // always continues to the next one
            self.execute_run(run).await;
            match self.repository.runs.get_by_id(run.id).await {
                Ok(r) if r.status == "ok" => ok += 1,
                _ => failed += 1,
            }
        }
        tracing::info!("sweep finished: ok={} failed={}", ok, failed);
    }

    /// Providers flagged for automatic processing that have no queued or
    /// running run yet get one pending run per sweep.
    async fn enqueue_auto_providers(&self) -> AppResult<()> {
        let providers = self.repository.providers.list_auto_process().await?;
        for provider in providers {
            let open = self
                .repository
                .runs
                .list(Some(provider.id), 5)
                .await?
                .into_iter()
                .any(|r| r.status == "pending" || r.status == "running");
            if !open {
                self.enqueue(provider.id).await?;
                tracing::info!("sweep: enqueued run for provider '{}'", provider.name);
            }
        }
        Ok(())
    }

    /// Execute one run to completion. Never returns an error: any failure
    /// is captured on the run record (status=failed, last_error) so the
    /// record is never lost or left dangling.
    pub async fn execute_run(&self, run: &PlanRun) {
        let claimed = match self.repository.runs.mark_running(run.id).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                tracing::info!("run {} already claimed, skipping", run.id);
                return;
            }
            Err(e) => {
                tracing::error!("run {}: cannot mark running: {}", run.id, e);
                return;
            }
        };

        let flag = CancelFlag::new();
        if let Ok(mut registry) = self.running.lock() {
            registry.insert(run.id, flag.clone());
        }

        let result = self.execute_claimed(&claimed, &flag).await;

        if let Ok(mut registry) = self.running.lock() {
            registry.remove(&run.id);
        }

        match result {
            Ok((downloaded, imported)) => {
                if let Err(e) = self.repository.runs.mark_ok(run.id, downloaded, imported).await {
                    tracing::error!("run {}: cannot mark ok: {}", run.id, e);
                }
                let _ = self
                    .repository
                    .providers
                    .set_connection_status(claimed.provider_id, "ok", None)
                    .await;
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("run {} failed: {}", run.id, message);
                if let Err(e2) = self.repository.runs.mark_failed(run.id, &message).await {
                    tracing::error!("run {}: cannot mark failed: {}", run.id, e2);
                }
                let _ = self
                    .repository
                    .providers
                    .set_connection_status(claimed.provider_id, "failed", Some(&message))
                    .await;
            }
        }
    }

    async fn execute_claimed(&self, run: &PlanRun, cancel: &CancelFlag) -> AppResult<(i32, i32)> {
        let provider = self.repository.providers.get_by_id(run.provider_id).await?;
        let _ = self
            .repository
            .providers
            .set_connection_status(provider.id, "running", None)
            .await;

        let files = self.source.list(&provider).await?;
        self.append_log(run.id, &format!("{} file(s) visible in inbox\n", files.len()))
            .await;

        let mut downloaded = 0i32;
        let mut imported = 0i32;

        if provider.multi_file_mode {
            let summary = self.run_multi_file(run, &provider, &files, cancel).await?;
            downloaded += 1;
            imported += 1;
            self.append_log(run.id, &format!("{}\n", summary.message())).await;
        } else {
            let mut matches = all_matches(&files, &provider.file_name_pattern);
            if let Some(max) = provider.max_files_per_run {
                matches.truncate(max.max(0) as usize);
            }
            if matches.is_empty() {
                self.append_log(run.id, "No files matched the provider pattern\n").await;
            }
            for file in matches {
                let bytes = self.source.fetch(&provider, &file.name).await?;
                downloaded += 1;
                self.keep_raw_attachment(run.id, &file.name, &bytes).await;

                match self
                    .import
                    .import_bytes(&provider, &file.name, &bytes, Some(run.id), cancel)
                    .await
                {
                    Ok(summary) => {
                        imported += 1;
                        self.repository
                            .runs
                            .create_processed_attachment(run.id, &file.name)
                            .await?;
                        self.append_log(run.id, &format!("{}\n", summary.message())).await;
                        if summary.stopped_early {
                            self.append_log(run.id, "Stopped by operator\n").await;
                            break;
                        }
                    }
                    Err(e @ (AppError::NoMappingTemplate(_) | AppError::EmptyFeed(_))) => {
                        // Fatal preconditions abort the run before/without
                        // touching rows
                        return Err(e);
                    }
                    Err(e) => {
                        self.append_log(run.id, &format!("{}: import failed: {}\n", file.name, e))
                            .await;
                        return Err(e);
                    }
                }
            }
        }

        self.append_log(
            run.id,
            &format!("Downloaded: {} - Imported: {}\n", downloaded, imported),
        )
        .await;
        Ok((downloaded, imported))
    }

    /// Multi-file providers: fetch base + secondary files, left-join them
    /// on the merge key, then push the merged CSV through the standard
    /// pipeline.
    async fn run_multi_file(
        &self,
        run: &PlanRun,
        provider: &Provider,
        files: &[crate::services::transfer::FeedFile],
        cancel: &CancelFlag,
    ) -> AppResult<RunSummary> {
        let merge_key = provider.merge_key.clone().unwrap_or_else(|| "Matnr".to_string());
        let base_file = newest_match(files, &provider.file_name_pattern).ok_or_else(|| {
            AppError::EmptyFeed(format!(
                "no base file matching '{}' in inbox",
                provider.file_name_pattern
            ))
        })?;

        let mut merger = FeedMerger::new(merge_key);
        let base_bytes = self.source.fetch(provider, &base_file.name).await?;
        self.keep_raw_attachment(run.id, &base_file.name, &base_bytes).await;
        let base_text = crate::ingest::decode_feed(&base_bytes).text;
        let base = merger.parse_fixed(&base_text, provider.csv_delimiter.as_deref(), "");

        if base.is_empty() {
            return Err(AppError::EmptyFeed(format!(
                "base file {} is empty or unparseable",
                base_file.name
            )));
        }

        let mut extras = Vec::new();
        let mut merged_name_parts = vec![base_file.name.clone()];
        for feed in provider.secondary_feeds() {
            let Some(found) = newest_match(files, &feed.pattern) else {
                self.append_log(run.id, &format!("No file for secondary pattern {}\n", feed.pattern))
                    .await;
                continue;
            };
            let bytes = self.source.fetch(provider, &found.name).await?;
            self.keep_raw_attachment(run.id, &found.name, &bytes).await;
            let text = crate::ingest::decode_feed(&bytes).text;
            let parsed = if feed.parse_mode == "trailing_number" {
                let column = feed.value_column.clone().unwrap_or_else(|| "deee_tax".to_string());
                merger.parse_trailing_number(&text, &column)
            } else {
                merger.parse_fixed(&text, None, &feed.prefix)
            };
            merged_name_parts.push(found.name.clone());
            extras.push(parsed);
        }

        let merged = merger.merge(base, extras);
        let csv_text = merger.to_csv(&merged);
        let merged_name = format!("merged_{}.csv", merged_name_parts.join("+"));
        self.append_log(
            run.id,
            &format!(
                "Merged {} file(s) on key '{}': {} rows, {} columns\n",
                merged_name_parts.len(),
                merger.merge_key(),
                merged.len(),
                merger.headers().len()
            ),
        )
        .await;

        // The merged blob uses ';' regardless of the provider's configured
        // delimiter
        let mut merged_provider = provider.clone();
        merged_provider.csv_delimiter = Some(";".to_string());
        merged_provider.has_header = true;

        let summary = self
            .import
            .import_bytes(&merged_provider, &merged_name, csv_text.as_bytes(), Some(run.id), cancel)
            .await?;
        self.repository
            .runs
            .create_processed_attachment(run.id, &merged_name)
            .await?;
        Ok(summary)
    }

    /// Persist raw source bytes on the run, best-effort behind the retry
    /// policy. Exhaustion logs a notice and leaves a placeholder; the run
    /// does not fail over raw-file retention.
    async fn keep_raw_attachment(&self, run_id: i32, name: &str, bytes: &[u8]) {
        let repository = &self.repository;
        let result = self
            .attachment_retry
            .run(|| async move { repository.runs.create_raw_attachment(run_id, name, bytes).await })
            .await;

        match result {
            Ok(Some(())) => {}
            Ok(None) => {
                let _ = repository.runs.create_raw_placeholder(run_id, name).await;
                self.append_log(
                    run_id,
                    &format!("Notice: raw copy of {} not kept (contended); import unaffected\n", name),
                )
                .await;
            }
            Err(e) => {
                let _ = repository.runs.create_raw_placeholder(run_id, name).await;
                self.append_log(
                    run_id,
                    &format!("Notice: raw copy of {} not kept ({}); import unaffected\n", name, e),
                )
                .await;
            }
        }
    }

    async fn append_log(&self, run_id: i32, chunk: &str) {
        if let Err(e) = self.repository.runs.append_log(run_id, chunk).await {
            tracing::warn!("run {}: cannot append log: {}", run_id, e);
        }
    }
}
