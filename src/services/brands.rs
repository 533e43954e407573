//! Brand alias resolution
//!
//! Supplier feeds carry free-text brand labels ("SMG", "SAMSUNG ELECTRONICS",
//! "Lindy "). Resolution goes exact-normalized-name, then alias set, then
//! gives up and queues a pending entry for an operator. Resolving one label
//! propagates to every provider's pending entry carrying the same label, so
//! the same typo never needs re-resolving per supplier.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

use crate::{
    error::{AppError, AppResult},
    models::brand::{Brand, BrandSample, PendingBrand, ResolutionReport},
    models::PendingBrandState,
    repository::Repository,
};

/// Invisible/zero-width characters stripped before comparison
const INVISIBLE_CHARS: &[char] = &[
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{00A0}', '\u{2007}', '\u{202F}',
    '\u{2060}', '\u{180E}',
];

/// Normalize a brand label for comparison: trim, strip invisible
/// characters, fold accents to their base letters, lowercase.
pub fn normalize_label(label: &str) -> String {
    let stripped: String = label
        .trim()
        .chars()
        .filter(|c| !INVISIBLE_CHARS.contains(c))
        .collect();
    stripped
        .nfkd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// In-memory lookup index over the full brand table. Built once per import
/// run / reverify pass; lookups are pure so the matching rules are testable
/// without a database.
#[derive(Debug, Default)]
pub struct BrandIndex {
    by_name: HashMap<String, i32>,
    by_alias: HashMap<String, i32>,
    /// (normalized name, id) pairs for the prefix suggestion scan
    entries: Vec<(String, i32)>,
}

impl BrandIndex {
    pub fn build(brands: &[Brand]) -> Self {
        let mut index = BrandIndex::default();
        for brand in brands {
            let key = normalize_label(&brand.name);
            if !key.is_empty() {
                index.by_name.insert(key.clone(), brand.id);
                index.entries.push((key, brand.id));
            }
            for alias in brand.alias_list() {
                let akey = normalize_label(&alias);
                if !akey.is_empty() {
                    index.by_alias.insert(akey.clone(), brand.id);
                    index.entries.push((akey, brand.id));
                }
            }
        }
        index
    }

    /// Exact normalized name, then exact normalized alias
    pub fn lookup(&self, label: &str) -> Option<i32> {
        let key = normalize_label(label);
        if key.is_empty() {
            return None;
        }
        self.by_name
            .get(&key)
            .or_else(|| self.by_alias.get(&key))
            .copied()
    }

    /// Lightweight partial match used only as a hint on pending entries:
    /// the label's first three characters matched as a prefix. Only an
    /// unambiguous hit (a single matching brand) is suggested, and a
    /// suggestion is never auto-applied.
    pub fn suggest(&self, label: &str) -> Option<i32> {
        let key = normalize_label(label);
        if key.chars().count() < 3 {
            return None;
        }
        let prefix: String = key.chars().take(3).collect();
        let mut candidates: Vec<i32> = self
            .entries
            .iter()
            .filter(|(entry, _)| entry.starts_with(&prefix))
            .map(|(_, id)| *id)
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        if candidates.len() == 1 {
            candidates.pop()
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct BrandsService {
    repository: Repository,
}

impl BrandsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Brand>> {
        self.repository.brands.list().await
    }

    pub async fn create(
        &self,
        name: &str,
        manufacturer: Option<&str>,
        aliases: Option<&str>,
    ) -> AppResult<Brand> {
        if let Some(existing) = self.repository.brands.find_by_name(name).await? {
            return Err(AppError::Conflict(format!(
                "A brand with this name already exists: {}",
                existing.name
            )));
        }
        self.repository.brands.create(name, manufacturer, aliases).await
    }

    /// Load the full alias index (once per run, not per row)
    pub async fn load_index(&self) -> AppResult<BrandIndex> {
        let brands = self.repository.brands.list().await?;
        Ok(BrandIndex::build(&brands))
    }

    pub async fn list_pending(&self, state: Option<&str>) -> AppResult<Vec<PendingBrand>> {
        self.repository.brands.list_pending(state).await
    }

    /// Record an unrecognized label seen during an import: create or bump
    /// the (label, provider) pending pair with an auto-computed suggestion
    /// and up to 10 sample products.
    pub async fn note_unresolved(
        &self,
        index: &BrandIndex,
        raw_label: &str,
        provider_id: i32,
        sample: Option<BrandSample>,
    ) -> AppResult<PendingBrand> {
        let label = raw_label.trim();
        let suggestion = index.suggest(label);
        let samples = serde_json::to_value(sample.iter().cloned().collect::<Vec<_>>())
            .unwrap_or_else(|_| serde_json::Value::Array(vec![]));

        let pending = self
            .repository
            .brands
            .upsert_pending(label, provider_id, 1, suggestion, &samples)
            .await?;

        // Merge the new sample into an existing row, bounded at 10
        if let Some(sample) = sample {
            let mut existing: Vec<BrandSample> =
                serde_json::from_value(pending.sample_products.clone()).unwrap_or_default();
            let already = existing
                .iter()
                .any(|s| s.ean == sample.ean && s.reference == sample.reference);
            if !already && existing.len() < 10 {
                existing.push(sample);
                let value = serde_json::to_value(&existing)
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                self.repository.brands.set_pending_samples(pending.id, &value).await?;
            }
        }
        Ok(pending)
    }

    /// Operator action: attach the raw label as an alias on the chosen
    /// brand, validate this pending entry, then cross-resolve every other
    /// provider's pending entry carrying the same label.
    pub async fn resolve_pending(&self, pending_id: i32, brand_id: i32) -> AppResult<ResolutionReport> {
        let pending = self.repository.brands.get_pending(pending_id).await?;
        let brand = self.repository.brands.get_by_id(brand_id).await?;

        self.add_alias(&brand, &pending.raw_label, Some(pending.provider_id), "pending_resolution")
            .await?;

        self.repository
            .brands
            .set_pending_state(pending_id, PendingBrandState::Validated.as_str(), Some(brand.id), None)
            .await?;

        let cross = self
            .cross_resolve(&pending.raw_label, brand.id, pending_id)
            .await?;

        tracing::info!(
            "brand '{}' resolved to '{}' (+{} other providers)",
            pending.raw_label,
            brand.name,
            cross
        );
        Ok(ResolutionReport {
            resolved: 1,
            cross_provider_resolved: cross as u32,
        })
    }

    /// Create a new brand from a pending label. When the operator supplies
    /// a different name, the file label becomes an alias of the new brand.
    pub async fn create_brand_from_pending(
        &self,
        pending_id: i32,
        name: Option<&str>,
        manufacturer: Option<&str>,
    ) -> AppResult<Brand> {
        let pending = self.repository.brands.get_pending(pending_id).await?;
        let file_label = pending.raw_label.trim().to_string();
        let brand_name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| file_label.clone());

        if let Some(existing) = self.repository.brands.find_by_name(&brand_name).await? {
            return Err(AppError::Conflict(format!(
                "A brand with this name already exists: {}",
                existing.name
            )));
        }

        let aliases = if normalize_label(&brand_name) != normalize_label(&file_label) {
            Some(file_label.to_uppercase())
        } else {
            None
        };
        let brand = self
            .repository
            .brands
            .create(&brand_name, manufacturer, aliases.as_deref())
            .await?;

        self.repository
            .brands
            .set_pending_state(
                pending_id,
                PendingBrandState::NewBrand.as_str(),
                Some(brand.id),
                Some(brand.id),
            )
            .await?;

        tracing::info!("created brand '{}' (id={}) from pending label", brand.name, brand.id);
        Ok(brand)
    }

    pub async fn ignore_pending(&self, pending_id: i32) -> AppResult<PendingBrand> {
        self.repository
            .brands
            .set_pending_state(pending_id, PendingBrandState::Ignored.as_str(), None, None)
            .await
    }

    /// Re-run lookup against the current brand/alias state for every
    /// still-pending entry. Idempotent: a second pass with no intervening
    /// alias changes resolves nothing.
    pub async fn reverify_all_pending(&self) -> AppResult<ResolutionReport> {
        let index = self.load_index().await?;
        let mut resolved = 0u32;

        let mut pending = self.repository.brands.list_pending(Some("pending")).await?;
        pending.extend(self.repository.brands.list_pending(Some("new_brand")).await?);

        for entry in pending {
            let Some(brand_id) = index.lookup(&entry.raw_label) else {
                continue;
            };
            // A label matching the brand auto-created from itself stays in
            // its new_brand state
            if entry.created_brand_id == Some(brand_id) {
                continue;
            }
            let brand = self.repository.brands.get_by_id(brand_id).await?;
            self.add_alias(&brand, &entry.raw_label, Some(entry.provider_id), "reverify")
                .await?;
            self.repository
                .brands
                .set_pending_state(entry.id, PendingBrandState::Validated.as_str(), Some(brand_id), None)
                .await?;
            resolved += 1;
            tracing::info!(
                "reverify: '{}' (provider {}) -> brand '{}'",
                entry.raw_label,
                entry.provider_id,
                brand.name
            );
        }

        tracing::info!("reverify completed: {} pending brand(s) resolved", resolved);
        Ok(ResolutionReport {
            resolved,
            cross_provider_resolved: 0,
        })
    }

    /// Add `label` to the brand's alias set (uppercased, deduplicated;
    /// skipped when it equals the brand name)
    async fn add_alias(
        &self,
        brand: &Brand,
        label: &str,
        provider_id: Option<i32>,
        source: &str,
    ) -> AppResult<()> {
        let new_alias = label.trim().to_uppercase();
        if new_alias.is_empty() || normalize_label(&new_alias) == normalize_label(&brand.name) {
            return Ok(());
        }
        let mut aliases = brand.alias_list();
        if aliases.iter().any(|a| a.eq_ignore_ascii_case(&new_alias)) {
            return Ok(());
        }
        aliases.push(new_alias.clone());
        self.repository
            .brands
            .set_aliases(brand.id, &aliases.join(","), &new_alias, provider_id, source)
            .await?;
        tracing::info!("added alias '{}' to brand '{}' (id={})", new_alias, brand.name, brand.id);
        Ok(())
    }

    /// Find-all-matching + bulk-update in one statement: every pending row
    /// across all providers whose label normalizes to the same key is
    /// validated onto `brand_id`.
    async fn cross_resolve(&self, raw_label: &str, brand_id: i32, except_id: i32) -> AppResult<u64> {
        let key = normalize_label(raw_label);
        let pending = self.repository.brands.list_pending(Some("pending")).await?;
        let ids: Vec<i32> = pending
            .iter()
            .filter(|p| p.id != except_id && normalize_label(&p.raw_label) == key)
            .map(|p| p.id)
            .collect();
        self.repository.brands.validate_pending_bulk(&ids, brand_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn brand(id: i32, name: &str, aliases: Option<&str>) -> Brand {
        Brand {
            id,
            name: name.to_string(),
            manufacturer: None,
            aliases: aliases.map(String::from),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize_label("  LINDY  "), "lindy");
    }

    #[test]
    fn test_normalize_folds_accents() {
        assert_eq!(normalize_label("Électrolux"), "electrolux");
        assert_eq!(normalize_label("Müller"), "muller");
    }

    #[test]
    fn test_normalize_strips_invisible_chars() {
        assert_eq!(normalize_label("Lin\u{200B}dy\u{00A0}"), "lindy");
    }

    #[test]
    fn test_index_exact_name_match() {
        let index = BrandIndex::build(&[brand(1, "Samsung", None)]);
        assert_eq!(index.lookup("SAMSUNG"), Some(1));
        assert_eq!(index.lookup(" samsung "), Some(1));
    }

    #[test]
    fn test_index_alias_match() {
        let index = BrandIndex::build(&[brand(1, "Samsung", Some("SMG,SAMSUNG ELECTRONICS"))]);
        assert_eq!(index.lookup("smg"), Some(1));
        assert_eq!(index.lookup("Samsung Electronics"), Some(1));
    }

    #[test]
    fn test_index_miss() {
        let index = BrandIndex::build(&[brand(1, "Samsung", Some("SMG"))]);
        assert_eq!(index.lookup("Sony"), None);
        assert_eq!(index.lookup(""), None);
    }

    #[test]
    fn test_index_accent_insensitive_alias() {
        let index = BrandIndex::build(&[brand(2, "Electrolux", Some("ÉLECTROLUX"))]);
        assert_eq!(index.lookup("electrolux"), Some(2));
    }

    #[test]
    fn test_suggest_unambiguous_prefix() {
        let index = BrandIndex::build(&[brand(1, "Lindy", None), brand(2, "Samsung", None)]);
        assert_eq!(index.suggest("LINDY COMPUTER"), Some(1));
    }

    #[test]
    fn test_suggest_ambiguous_returns_none() {
        let index = BrandIndex::build(&[brand(1, "Samsung", None), brand(2, "Samsonite", None)]);
        assert_eq!(index.suggest("sams"), None);
    }

    #[test]
    fn test_suggest_short_label_returns_none() {
        let index = BrandIndex::build(&[brand(1, "LG", None)]);
        assert_eq!(index.suggest("LG"), None);
    }

    #[test]
    fn test_reverify_lookup_is_idempotent_on_index() {
        // Once a label is an alias, a second lookup resolves identically;
        // the service layer skips already-validated rows so a second pass
        // changes nothing.
        let index = BrandIndex::build(&[brand(1, "Lindy", Some("LINDY GMBH"))]);
        assert_eq!(index.lookup("lindy gmbh"), Some(1));
        assert_eq!(index.lookup("lindy gmbh"), Some(1));
    }
}
