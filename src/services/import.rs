//! Staging & reconciliation engine
//!
//! Drives one file through the full pipeline: decode, tokenize, map, then
//! per row: dedup, key normalization, existing-entity lookup, brand
//! resolution, policy-aware commit. A bad row never aborts the run; it
//! becomes a classified quarantine line with its raw content preserved.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::{
    error::{AppError, AppResult},
    ingest::{decode_feed_with_hint, sniff_delimiter, MappedRow, MappingEngine, RowSet},
    models::brand::BrandSample,
    models::{ErrorLineType, Product, Provider, RunSummary, UpdateMode},
    repository::catalog::ProductWrite,
    repository::Repository,
    services::brands::{BrandIndex, BrandsService},
    services::CancelFlag,
};

/// Longest key kept after normalization; supplier files occasionally carry
/// garbage in the barcode cell
const MAX_KEY_LEN: usize = 50;

#[derive(Clone)]
pub struct ImportService {
    repository: Repository,
    brands: BrandsService,
    progress_every: usize,
}

impl ImportService {
    pub fn new(repository: Repository, brands: BrandsService, progress_every: usize) -> Self {
        Self {
            repository,
            brands,
            progress_every: progress_every.max(1),
        }
    }

    /// Import one file worth of bytes for a provider. Fatal precondition
    /// failures (no template, empty feed) error out before any row is
    /// touched; everything past that point is per-row recoverable.
    pub async fn import_bytes(
        &self,
        provider: &Provider,
        file_name: &str,
        bytes: &[u8],
        run_id: Option<i32>,
        cancel: &CancelFlag,
    ) -> AppResult<RunSummary> {
        let engine = self.mapping_engine(provider, file_name).await?;

        let feed = decode_feed_with_hint(bytes, provider.encoding_hint.as_deref());
        let delimiter = provider
            .csv_delimiter
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| sniff_delimiter(&feed.text));
        let set = RowSet::parse(&feed.text, &delimiter, provider.has_header);

        if set.rows.is_empty() {
            // An empty base file must be surfaced, never silently imported
            // as zero rows
            return Err(AppError::EmptyFeed(format!(
                "{}: no data rows (delimiter '{}')",
                file_name, delimiter
            )));
        }

        let history = self
            .repository
            .staging
            .create_history(run_id, Some(provider.id), file_name)
            .await?;

        let brand_index = self.brands.load_index().await?;

        let mut summary = RunSummary {
            file_name: file_name.to_string(),
            ..Default::default()
        };
        let mut state = RowLoopState::default();

        for (idx, row) in set.rows.iter().enumerate() {
            let row_number = (idx + 1) as i32;

            // Operator-requested stop is polled per row, not raised as an
            // exception
            if cancel.is_cancelled() {
                summary.stopped_early = true;
                tracing::warn!("import of {} stopped at row {}", file_name, row_number);
                break;
            }

            summary.total_rows += 1;
            if feed.degraded && row.iter().any(|c| c.contains('\u{FFFD}')) {
                summary.encoding_errors += 1;
            }

            let outcome = self
                .process_row(provider, &engine, &set, row, row_number, history.id, &brand_index, &mut state, &mut summary)
                .await;

            if let Err(e) = outcome {
                // Unexpected failure: preserve the raw row and continue
                summary.errors += 1;
                let raw = serde_json::to_value(set.row_as_map(row)).ok();
                self.repository
                    .staging
                    .insert_error_line(
                        history.id,
                        row_number,
                        None,
                        None,
                        None,
                        ErrorLineType::TechnicalError.as_str(),
                        Some(&e.to_string()),
                        raw.as_ref(),
                        None,
                    )
                    .await?;
                tracing::warn!("row {} of {} failed: {}", row_number, file_name, e);
            }

            if summary.total_rows % self.progress_every == 0 {
                tracing::info!(
                    "{}: {} rows processed ({} created, {} updated, {} quarantined)",
                    file_name,
                    summary.total_rows,
                    summary.created,
                    summary.updated,
                    summary.quarantined
                );
            }
        }

        self.repository.staging.finalize_history(history.id, &summary).await?;
        tracing::info!("{}: {}", file_name, summary.message());
        Ok(summary)
    }

    /// Resolve the provider's active mapping template into an engine.
    /// Hard precondition: without an active template the import aborts
    /// before touching any row; there is no sensible default mapping.
    async fn mapping_engine(&self, provider: &Provider, file_name: &str) -> AppResult<MappingEngine> {
        let template_id = provider.mapping_template_id.ok_or_else(|| {
            AppError::NoMappingTemplate(format!(
                "provider '{}' has no mapping template configured",
                provider.name
            ))
        })?;
        let template = self.repository.templates.get_by_id(template_id).await?;
        if !template.active {
            return Err(AppError::NoMappingTemplate(format!(
                "mapping template '{}' is inactive",
                template.name
            )));
        }
        let lines = self.repository.templates.lines(template_id).await?;
        let engine = MappingEngine::new(lines, file_name, Utc::now().date_naive());
        if engine.is_empty() {
            return Err(AppError::NoMappingTemplate(format!(
                "mapping template '{}' has no active lines",
                template.name
            )));
        }
        Ok(engine)
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_row(
        &self,
        provider: &Provider,
        engine: &MappingEngine,
        set: &RowSet,
        row: &[String],
        row_number: i32,
        history_id: i32,
        brand_index: &BrandIndex,
        state: &mut RowLoopState,
        summary: &mut RunSummary,
    ) -> AppResult<()> {
        let raw = || serde_json::to_value(set.row_as_map(row)).ok();

        // 1. Mapping; a required-field violation rejects the whole row
        let mapped = match engine.map_row(set, row) {
            Ok(mapped) => mapped,
            Err(e) => {
                summary.errors += 1;
                self.repository
                    .staging
                    .insert_error_line(
                        history_id,
                        row_number,
                        None,
                        None,
                        None,
                        ErrorLineType::MissingRequiredField.as_str(),
                        Some(&e.to_string()),
                        raw().as_ref(),
                        None,
                    )
                    .await?;
                return Ok(());
            }
        };

        let name = mapped.get("name").unwrap_or("").to_string();
        let keys = normalize_keys(mapped.get("barcode").unwrap_or(""));
        let primary_key = keys.first().cloned();
        let reference = mapped.get("sku").map(String::from);

        // 2. Dedup on the mapped content (row number excluded)
        let digest = row_digest(&mapped);
        if let Some(slot) = state.digests.get(&digest).copied() {
            summary.deduped += 1;
            match slot {
                Some(line_id) => self.repository.staging.bump_duplicate(line_id, row_number).await?,
                None => {
                    let line_id = self
                        .repository
                        .staging
                        .insert_error_line(
                            history_id,
                            row_number,
                            primary_key.as_deref(),
                            reference.as_deref(),
                            Some(&name),
                            ErrorLineType::DedupedIdentical.as_str(),
                            Some("identical row already processed in this file"),
                            raw().as_ref(),
                            None,
                        )
                        .await?;
                    state.digests.insert(digest, Some(line_id));
                }
            }
            return Ok(());
        }
        state.digests.insert(digest, None);

        // 3. A row with neither key nor name cannot be committed or even
        // usefully quarantined for matching
        if keys.is_empty() && name.is_empty() {
            summary.quarantined += 1;
            self.repository
                .staging
                .insert_error_line(
                    history_id,
                    row_number,
                    None,
                    reference.as_deref(),
                    None,
                    ErrorLineType::NoKey.as_str(),
                    Some("no key and no name"),
                    raw().as_ref(),
                    None,
                )
                .await?;
            return Ok(());
        }

        // 4. Duplicate primary key within the file
        if let Some(primary) = &primary_key {
            if let Some(first_line) = state.seen_keys.get(primary).copied() {
                summary.quarantined += 1;
                match first_line {
                    Some(line_id) => {
                        self.repository.staging.bump_duplicate(line_id, row_number).await?
                    }
                    None => {
                        let line_id = self
                            .repository
                            .staging
                            .insert_error_line(
                                history_id,
                                row_number,
                                Some(primary),
                                reference.as_deref(),
                                Some(&name),
                                ErrorLineType::DuplicateKeyInFile.as_str(),
                                Some("key already carried by an earlier row in this file"),
                                raw().as_ref(),
                                None,
                            )
                            .await?;
                        state.seen_keys.insert(primary.clone(), Some(line_id));
                    }
                }
                return Ok(());
            }
            state.seen_keys.insert(primary.clone(), None);
        }

        // 5. Existing-entity lookup by ANY of the row's keys
        let candidates = self.repository.catalog.find_by_any_barcode(&keys).await?;

        // Duplicate barcodes in the catalog: clear them when the provider
        // policy says so, and skip this row for the run
        if provider.clear_duplicate_barcodes {
            if let Some(dup_barcode) = duplicated_barcode(&candidates) {
                self.repository.catalog.clear_barcode_duplicates(&dup_barcode).await?;
                summary.quarantined += 1;
                self.repository
                    .staging
                    .insert_error_line(
                        history_id,
                        row_number,
                        Some(&dup_barcode),
                        reference.as_deref(),
                        Some(&name),
                        ErrorLineType::DuplicateReference.as_str(),
                        Some("catalog carried several products with this barcode; barcodes cleared"),
                        raw().as_ref(),
                        None,
                    )
                    .await?;
                return Ok(());
            }
        }

        let matched = keys.iter().find_map(|key| {
            candidates
                .iter()
                .find(|p| p.barcode.as_deref() == Some(key.as_str()))
                .map(|p| (p.clone(), key.clone()))
        });

        // 6. Skip-existing policy acts on the whole key set, not just the
        // primary key
        if provider.skip_existing {
            if let Some((existing, matched_key)) = &matched {
                summary.skipped_existing += 1;
                self.repository
                    .staging
                    .insert_error_line(
                        history_id,
                        row_number,
                        Some(matched_key),
                        reference.as_deref(),
                        Some(&name),
                        ErrorLineType::SkippedExisting.as_str(),
                        Some(&format!("matched existing product on key {}", matched_key)),
                        raw().as_ref(),
                        Some(existing.id),
                    )
                    .await?;
                return Ok(());
            }
        }

        // 7. Brand resolution; an unresolved label queues a pending entry
        // and the row proceeds brandless
        let brand_label = mapped.get("brand").unwrap_or("").trim().to_string();
        let brand_id = if brand_label.is_empty() {
            None
        } else {
            match brand_index.lookup(&brand_label) {
                Some(id) => Some(id),
                None => {
                    let sample = BrandSample {
                        ean: primary_key.clone().unwrap_or_default(),
                        reference: reference.clone().unwrap_or_default(),
                        name: name.clone(),
                    };
                    self.brands
                        .note_unresolved(brand_index, &brand_label, provider.id, Some(sample))
                        .await?;
                    if state.new_brand_labels.insert(brand_label.clone()) {
                        summary.new_brands.push(brand_label.clone());
                    }
                    None
                }
            }
        };

        // 8. Commit
        let write = self.build_write(provider, &mapped, &name, primary_key.as_deref(), reference.as_deref(), brand_id);
        let committed_history = history_id;

        match matched {
            Some((existing, _matched_key)) => {
                let merged = merge_for_update(&existing, write, &mapped);
                self.repository.catalog.update(existing.id, &merged, committed_history).await?;
                summary.updated += 1;
            }
            None => {
                if name.is_empty() {
                    // Key but no name: nothing sensible to create
                    summary.quarantined += 1;
                    self.repository
                        .staging
                        .insert_error_line(
                            history_id,
                            row_number,
                            primary_key.as_deref(),
                            reference.as_deref(),
                            None,
                            ErrorLineType::NoKey.as_str(),
                            Some("key present but product name missing"),
                            raw().as_ref(),
                            None,
                        )
                        .await?;
                    return Ok(());
                }
                self.repository.catalog.create(&write, provider.id, committed_history).await?;
                summary.created += 1;
            }
        }

        // 9. Vendor snapshot for this (EAN, provider)
        if let Some(ean) = &primary_key {
            let quantity = parse_quantity(mapped.get("quantity").unwrap_or(""));
            let price = parse_decimal(mapped.get("cost_price").unwrap_or(""), &provider.decimal_separator);
            let currency = mapped.get("currency").unwrap_or("EUR");
            self.repository
                .vendor_entries
                .upsert(
                    ean,
                    provider.id,
                    provider.supplier_name.as_deref(),
                    quantity,
                    price,
                    if currency.is_empty() { "EUR" } else { currency },
                    Some(history_id),
                )
                .await?;
        }

        Ok(())
    }

    fn build_write(
        &self,
        provider: &Provider,
        mapped: &MappedRow,
        name: &str,
        primary_key: Option<&str>,
        reference: Option<&str>,
        brand_id: Option<i32>,
    ) -> ProductWrite {
        let sep = &provider.decimal_separator;
        ProductWrite {
            name: if name.is_empty() {
                primary_key.unwrap_or("").to_string()
            } else {
                name.to_string()
            },
            barcode: primary_key.map(String::from),
            sku: reference.map(String::from),
            description: mapped.get("description").map(String::from),
            brand_id,
            list_price: parse_decimal(mapped.get("list_price").unwrap_or(""), sep),
            cost_price: parse_decimal(mapped.get("cost_price").unwrap_or(""), sep),
            deee_tax: parse_decimal(mapped.get("deee_tax").unwrap_or(""), sep),
        }
    }
}

/// Run-local mutable state; row processing is strictly sequential
#[derive(Default)]
struct RowLoopState {
    /// content digest -> quarantine line id of the first duplicate (None
    /// until one exists)
    digests: HashMap<String, Option<i32>>,
    /// primary key -> quarantine line id of its duplicate record
    seen_keys: HashMap<String, Option<i32>>,
    new_brand_labels: HashSet<String>,
}

/// Normalize the key cell: it may contain several comma-separated codes
/// (observed supplier quirk). Split, trim, keep printable characters only,
/// cap the length, drop empties. Order is preserved; the first entry is
/// the primary key.
pub fn normalize_keys(cell: &str) -> Vec<String> {
    let mut keys = Vec::new();
    for part in cell.split(',') {
        let cleaned: String = part
            .trim()
            .chars()
            .filter(|c| !c.is_control() && !c.is_whitespace())
            .take(MAX_KEY_LEN)
            .collect();
        if !cleaned.is_empty() && !keys.contains(&cleaned) {
            keys.push(cleaned);
        }
    }
    keys
}

/// Content digest of the mapped values; the row number never participates,
/// two byte-identical data rows collide by construction
pub fn row_digest(mapped: &MappedRow) -> String {
    let mut hasher = Sha256::new();
    for (field, value) in &mapped.values {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.as_bytes());
        hasher.update([0xFFu8]);
    }
    hex::encode(hasher.finalize())
}

/// Barcode shared by more than one candidate product, if any
fn duplicated_barcode(candidates: &[Product]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for product in candidates {
        if let Some(barcode) = product.barcode.as_deref() {
            *counts.entry(barcode).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .find(|(_, count)| *count > 1)
        .map(|(barcode, _)| barcode.to_string())
}

/// Apply per-field update policy when writing over an existing product:
/// `replace` fields always win, `fill_if_empty` fields only land on empty
/// targets, and fields the template did not map keep their current value.
fn merge_for_update(existing: &Product, incoming: ProductWrite, mapped: &MappedRow) -> ProductWrite {
    fn pick<T: Clone>(
        mapped: &MappedRow,
        field: &str,
        incoming: Option<T>,
        current: Option<T>,
        current_empty: bool,
    ) -> Option<T> {
        if mapped.get(field).is_none() {
            return current;
        }
        match mapped.update_mode(field) {
            UpdateMode::Replace => incoming.or(current),
            UpdateMode::FillIfEmpty => {
                if current_empty {
                    incoming.or(current)
                } else {
                    current
                }
            }
        }
    }

    let name = if mapped.get("name").is_some() {
        match mapped.update_mode("name") {
            UpdateMode::Replace => incoming.name.clone(),
            UpdateMode::FillIfEmpty => {
                if existing.name.trim().is_empty() {
                    incoming.name.clone()
                } else {
                    existing.name.clone()
                }
            }
        }
    } else {
        existing.name.clone()
    };

    ProductWrite {
        name,
        barcode: incoming.barcode.clone().or_else(|| existing.barcode.clone()),
        sku: pick(
            mapped,
            "sku",
            incoming.sku,
            existing.sku.clone(),
            existing.sku.as_deref().map_or(true, |s| s.trim().is_empty()),
        ),
        description: pick(
            mapped,
            "description",
            incoming.description,
            existing.description.clone(),
            existing
                .description
                .as_deref()
                .map_or(true, |s| s.trim().is_empty()),
        ),
        brand_id: pick(
            mapped,
            "brand",
            incoming.brand_id,
            existing.brand_id,
            existing.brand_id.is_none(),
        ),
        list_price: pick(
            mapped,
            "list_price",
            incoming.list_price,
            existing.list_price,
            existing.list_price.is_none(),
        ),
        cost_price: pick(
            mapped,
            "cost_price",
            incoming.cost_price,
            existing.cost_price,
            existing.cost_price.is_none(),
        ),
        deee_tax: pick(
            mapped,
            "deee_tax",
            incoming.deee_tax,
            existing.deee_tax,
            existing.deee_tax.is_none(),
        ),
    }
}

/// Parse a money cell honoring the provider's decimal separator; spaces in
/// grouped numbers ("1 234,56") are dropped
fn parse_decimal(value: &str, decimal_separator: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut normalized: String = trimmed.replace(' ', "");
    if decimal_separator != "." {
        normalized = normalized.replace(decimal_separator, ".");
    } else {
        // Tolerate a stray comma decimal even when dot is configured
        if !normalized.contains('.') {
            normalized = normalized.replace(',', ".");
        }
    }
    normalized.parse::<Decimal>().ok()
}

fn parse_quantity(value: &str) -> f64 {
    value.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::UpdateMode;
    use chrono::Utc;

    #[test]
    fn test_normalize_keys_multi() {
        assert_eq!(normalize_keys("123,456"), vec!["123", "456"]);
    }

    #[test]
    fn test_normalize_keys_trims_and_strips() {
        assert_eq!(normalize_keys(" 123 456 \t"), vec!["123456"]);
        assert_eq!(normalize_keys(",,"), Vec::<String>::new());
    }

    #[test]
    fn test_normalize_keys_caps_length() {
        let long = "9".repeat(80);
        let keys = normalize_keys(&long);
        assert_eq!(keys[0].len(), MAX_KEY_LEN);
    }

    #[test]
    fn test_normalize_keys_dedupes() {
        assert_eq!(normalize_keys("123,123"), vec!["123"]);
    }

    #[test]
    fn test_row_digest_identical_rows_collide() {
        let mut a = MappedRow::default();
        a.values.insert("name".to_string(), "Widget".to_string());
        a.values.insert("barcode".to_string(), "123".to_string());
        let mut b = MappedRow::default();
        b.values.insert("barcode".to_string(), "123".to_string());
        b.values.insert("name".to_string(), "Widget".to_string());
        assert_eq!(row_digest(&a), row_digest(&b));
    }

    #[test]
    fn test_row_digest_differs_on_value() {
        let mut a = MappedRow::default();
        a.values.insert("name".to_string(), "Widget".to_string());
        let mut b = MappedRow::default();
        b.values.insert("name".to_string(), "Gadget".to_string());
        assert_ne!(row_digest(&a), row_digest(&b));
    }

    #[test]
    fn test_parse_decimal_comma_separator() {
        assert_eq!(parse_decimal("1 234,56", ","), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_decimal("", ","), None);
        assert_eq!(parse_decimal("abc", ","), None);
    }

    #[test]
    fn test_parse_decimal_dot_default_tolerates_comma() {
        assert_eq!(parse_decimal("12,5", "."), Some(Decimal::new(125, 1)));
        assert_eq!(parse_decimal("12.5", "."), Some(Decimal::new(125, 1)));
    }

    fn product(name: &str, description: Option<&str>, cost: Option<Decimal>) -> Product {
        Product {
            id: 1,
            name: name.to_string(),
            barcode: Some("123".to_string()),
            sku: None,
            description: description.map(String::from),
            brand_id: None,
            list_price: None,
            cost_price: cost,
            deee_tax: None,
            created_by_provider_id: Some(1),
            last_import_history_id: None,
            last_import_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_merge_replace_overwrites() {
        let existing = product("Old name", Some("old desc"), Some(Decimal::new(100, 0)));
        let mut mapped = MappedRow::default();
        mapped.values.insert("name".to_string(), "New name".to_string());
        mapped.update_modes.insert("name".to_string(), UpdateMode::Replace);
        let incoming = ProductWrite {
            name: "New name".to_string(),
            ..Default::default()
        };
        let merged = merge_for_update(&existing, incoming, &mapped);
        assert_eq!(merged.name, "New name");
        // Unmapped fields keep their current values
        assert_eq!(merged.description.as_deref(), Some("old desc"));
        assert_eq!(merged.cost_price, Some(Decimal::new(100, 0)));
    }

    #[test]
    fn test_merge_fill_if_empty_keeps_existing() {
        let existing = product("Kept", Some("present"), None);
        let mut mapped = MappedRow::default();
        mapped
            .values
            .insert("description".to_string(), "incoming".to_string());
        mapped
            .update_modes
            .insert("description".to_string(), UpdateMode::FillIfEmpty);
        mapped
            .values
            .insert("cost_price".to_string(), "9.99".to_string());
        mapped
            .update_modes
            .insert("cost_price".to_string(), UpdateMode::FillIfEmpty);
        let incoming = ProductWrite {
            name: "Kept".to_string(),
            description: Some("incoming".to_string()),
            cost_price: Some(Decimal::new(999, 2)),
            ..Default::default()
        };
        let merged = merge_for_update(&existing, incoming, &mapped);
        // description was present -> kept; cost_price was empty -> filled
        assert_eq!(merged.description.as_deref(), Some("present"));
        assert_eq!(merged.cost_price, Some(Decimal::new(999, 2)));
    }
}
