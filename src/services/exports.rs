//! Administrative CSV export surfaces
//!
//! Plain `;`-separated text with a header row, UTF-8 with a byte-order-mark
//! so Windows spreadsheet tools pick the encoding up correctly.

use crate::{error::AppResult, repository::Repository};

/// UTF-8 BOM expected by Windows spreadsheet tools
const BOM: &str = "\u{FEFF}";

#[derive(Clone)]
pub struct ExportsService {
    repository: Repository,
}

impl ExportsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Barcode list: one line per catalog product carrying a barcode
    pub async fn barcodes_csv(&self) -> AppResult<String> {
        let rows = self.repository.catalog.list_barcodes().await?;
        let mut out = String::from(BOM);
        out.push_str("barcode;name;sku\n");
        for (barcode, name, sku) in rows {
            out.push_str(&format!(
                "{};{};{}\n",
                escape(&barcode),
                escape(&name),
                escape(sku.as_deref().unwrap_or(""))
            ));
        }
        Ok(out)
    }

    /// Provider configuration snapshot
    pub async fn providers_csv(&self) -> AppResult<String> {
        let providers = self.repository.providers.list(false).await?;
        let mut out = String::from(BOM);
        out.push_str(
            "name;supplier;pattern;delimiter;has_header;auto_process;schedule_active;skip_existing;last_status;last_run_at\n",
        );
        for p in providers {
            out.push_str(&format!(
                "{};{};{};{};{};{};{};{};{};{}\n",
                escape(&p.name),
                escape(p.supplier_name.as_deref().unwrap_or("")),
                escape(&p.file_name_pattern),
                escape(p.csv_delimiter.as_deref().unwrap_or("")),
                p.has_header,
                p.auto_process,
                p.schedule_active,
                p.skip_existing,
                escape(p.last_connection_status.as_deref().unwrap_or("")),
                p.last_run_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
            ));
        }
        Ok(out)
    }

    /// Brand table with aliases and manufacturer
    pub async fn brands_csv(&self) -> AppResult<String> {
        let brands = self.repository.brands.list().await?;
        let mut out = String::from(BOM);
        out.push_str("name;manufacturer;aliases\n");
        for brand in brands {
            out.push_str(&format!(
                "{};{};{}\n",
                escape(&brand.name),
                escape(brand.manufacturer.as_deref().unwrap_or("")),
                escape(brand.aliases.as_deref().unwrap_or("")),
            ));
        }
        Ok(out)
    }
}

fn escape(value: &str) -> String {
    if value.contains(';') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain_value_untouched() {
        assert_eq!(escape("Samsung"), "Samsung");
    }

    #[test]
    fn test_escape_quotes_and_separator() {
        assert_eq!(escape("a;b"), "\"a;b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
