//! Multi-file feed merger
//!
//! Some suppliers split one logical feed over several files sharing only a
//! partial key (typically a material/article number): a base article file,
//! a stock file, and a headerless tax file. The merger parses each file
//! into a key -> row map and left-joins them: only keys present in the base
//! file survive. The merged result converts to a single `;`-separated CSV
//! blob that flows through the standard import pipeline.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

/// Tab, or a run of two or more spaces (fixed-width exports)
static AUTO_DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t|\s{2,}").unwrap());

/// Leading 7-8 digit key of a headerless tax line
static LEADING_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{7,8})").unwrap());

/// Floating point token, comma or dot decimals
static FLOAT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+[.,]\d+)").unwrap());

/// Merges several parsed files on a shared key column
pub struct FeedMerger {
    merge_key: String,
    /// All non-key columns, in registration order (base file first, then
    /// each secondary file in file order)
    columns: Vec<String>,
    seen_columns: HashSet<String>,
}

pub type KeyedRows = HashMap<String, HashMap<String, String>>;

impl FeedMerger {
    pub fn new(merge_key: impl Into<String>) -> Self {
        Self {
            merge_key: merge_key.into(),
            columns: Vec::new(),
            seen_columns: HashSet::new(),
        }
    }

    pub fn merge_key(&self) -> &str {
        &self.merge_key
    }

    /// Parse a fixed/irregular-delimiter file with a header line.
    ///
    /// `delimiter` of `None` splits on tab or runs of >= 2 spaces; an
    /// explicit delimiter splits literally. Non-key columns are prefixed
    /// with `prefix_` to avoid collisions across files. Malformed lines
    /// (no key cell, empty key) are skipped, never fatal.
    pub fn parse_fixed(&mut self, content: &str, delimiter: Option<&str>, prefix: &str) -> KeyedRows {
        let mut result = KeyedRows::new();
        let mut headers: Vec<String> = Vec::new();
        let mut key_idx: Option<usize> = None;

        for (i, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }

            let cells: Vec<String> = match delimiter {
                Some(d) if !d.is_empty() => line.split(d).map(|c| c.trim().to_string()).collect(),
                _ => AUTO_DELIMITER
                    .split(line)
                    .map(|c| c.trim().to_string())
                    .collect(),
            };

            if i == 0 {
                headers = cells
                    .iter()
                    .map(|h| {
                        if !prefix.is_empty() && !h.eq_ignore_ascii_case(&self.merge_key) {
                            format!("{}_{}", prefix, h)
                        } else {
                            h.clone()
                        }
                    })
                    .collect();
                key_idx = headers
                    .iter()
                    .position(|h| h.eq_ignore_ascii_case(&self.merge_key));
                for h in &headers {
                    self.register_column(h);
                }
                continue;
            }

            let Some(key_idx) = key_idx else { continue };
            let Some(key) = cells.get(key_idx) else { continue };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }

            let mut row = HashMap::new();
            for (idx, header) in headers.iter().enumerate() {
                if idx == key_idx {
                    continue;
                }
                if let Some(value) = cells.get(idx) {
                    row.insert(header.clone(), value.clone());
                }
            }
            result.insert(key.to_string(), row);
        }

        tracing::debug!(
            "merger: parsed fixed file, {} rows on key '{}'",
            result.len(),
            self.merge_key
        );
        result
    }

    /// Parse a headerless "trailing-number-is-the-value" feed: the first
    /// 7-8 leading digits are the key, the last floating-point token on the
    /// line is the value. Lines without a leading key are skipped.
    pub fn parse_trailing_number(&mut self, content: &str, column_name: &str) -> KeyedRows {
        let mut result = KeyedRows::new();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            let Some(caps) = LEADING_KEY.captures(line) else {
                continue;
            };
            let key = caps[1].to_string();

            let value = FLOAT_TOKEN
                .find_iter(line)
                .last()
                .map(|m| m.as_str().replace(',', "."))
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0);

            let mut row = HashMap::new();
            row.insert(column_name.to_string(), value.to_string());
            result.insert(key, row);
        }

        self.register_column(column_name);
        tracing::debug!(
            "merger: parsed trailing-number file, {} rows, column '{}'",
            result.len(),
            column_name
        );
        result
    }

    /// LEFT JOIN: only keys present in `base` survive; secondary values are
    /// merged in where present and absent (empty on output) otherwise.
    pub fn merge(&self, base: KeyedRows, extras: Vec<KeyedRows>) -> KeyedRows {
        let mut merged = base;
        for extra in extras {
            for (key, row) in merged.iter_mut() {
                if let Some(extra_row) = extra.get(key) {
                    for (col, value) in extra_row {
                        row.insert(col.clone(), value.clone());
                    }
                }
            }
        }
        merged
    }

    /// All headers of the merged output, merge key first
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![self.merge_key.clone()];
        headers.extend(self.columns.iter().cloned());
        headers
    }

    /// Render the merged rows as one `;`-separated CSV text, header line
    /// first, keys sorted for deterministic output
    pub fn to_csv(&self, merged: &KeyedRows) -> String {
        if merged.is_empty() {
            return String::new();
        }

        let headers = self.headers();
        let mut out = String::new();
        out.push_str(&headers.join(";"));
        out.push('\n');

        let mut keys: Vec<&String> = merged.keys().collect();
        keys.sort();

        for key in keys {
            let row = &merged[key];
            let mut cells = vec![csv_escape(key)];
            for col in &self.columns {
                cells.push(csv_escape(row.get(col).map(String::as_str).unwrap_or("")));
            }
            out.push_str(&cells.join(";"));
            out.push('\n');
        }
        out
    }

    fn register_column(&mut self, name: &str) {
        if name.eq_ignore_ascii_case(&self.merge_key) {
            return;
        }
        if self.seen_columns.insert(name.to_string()) {
            self.columns.push(name.to_string());
        }
    }
}

fn csv_escape(value: &str) -> String {
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
    fn test_parse_fixed_tab_delimited() {
        let mut merger = FeedMerger::new("Matnr");
        let rows = merger.parse_fixed("Matnr\tName\tPrice\n10310134\tCable HDMI\t12.50\n", None, "");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows["10310134"]["Name"], "Cable HDMI");
        assert_eq!(merger.headers(), vec!["Matnr", "Name", "Price"]);
    }

    #[test]
    fn test_parse_fixed_multi_space_delimited() {
        let mut merger = FeedMerger::new("Matnr");
        let rows = merger.parse_fixed("Matnr   Stock\n10310134    42\n", None, "stock");
        assert_eq!(rows["10310134"]["stock_Stock"], "42");
    }

    #[test]
    fn test_parse_fixed_prefix_not_applied_to_key() {
        let mut merger = FeedMerger::new("Matnr");
        merger.parse_fixed("Matnr\tQty\n1\t2\n", None, "stock");
        assert_eq!(merger.headers(), vec!["Matnr", "stock_Qty"]);
    }

    #[test]
    fn test_parse_fixed_skips_malformed_lines() {
        let mut merger = FeedMerger::new("Matnr");
        let rows = merger.parse_fixed("Matnr\tName\n\n   \n10310134\tOk\n", None, "");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_parse_trailing_number() {
        let mut merger = FeedMerger::new("Matnr");
        let rows =
            merger.parse_trailing_number("10310134 920-010104?KIT DEEE 0.32\n", "deee_tax");
        assert_eq!(rows["10310134"]["deee_tax"], "0.32");
    }

    #[test]
    fn test_parse_trailing_number_comma_decimal() {
        let mut merger = FeedMerger::new("Matnr");
        let rows = merger.parse_trailing_number("1031013 SOME LABEL 1,25 0,45\n", "tax");
        // last float on the line wins
        assert_eq!(rows["1031013"]["tax"], "0.45");
    }

    #[test]
    fn test_parse_trailing_number_no_float_defaults_zero() {
        let mut merger = FeedMerger::new("Matnr");
        let rows = merger.parse_trailing_number("10310134 NO TAX HERE\n", "tax");
        assert_eq!(rows["10310134"]["tax"], "0");
    }

    #[test]
    fn test_left_join_only_base_keys_survive() {
        let mut merger = FeedMerger::new("K");
        let base = merger.parse_fixed("K\tname\nA\ta\nB\tb\nC\tc\n", None, "");
        let extra = merger.parse_fixed("K\tqty\nB\t1\nC\t2\nD\t3\n", None, "stock");

        let merged = merger.merge(base, vec![extra]);

        let mut keys: Vec<&String> = merged.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["A", "B", "C"]);
        // A has no secondary data
        assert!(merged["A"].get("stock_qty").is_none());
        assert_eq!(merged["B"]["stock_qty"], "1");
        // D never appears
        assert!(!merged.contains_key("D"));
    }

    #[test]
    fn test_to_csv_absent_secondary_cells_are_empty() {
        let mut merger = FeedMerger::new("K");
        let base = merger.parse_fixed("K\tname\nA\ta\nB\tb\n", None, "");
        let extra = merger.parse_fixed("K\tqty\nB\t9\n", None, "stock");
        let merged = merger.merge(base, vec![extra]);

        let csv = merger.to_csv(&merged);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "K;name;stock_qty");
        assert_eq!(lines[1], "A;a;");
        assert_eq!(lines[2], "B;b;9");
    }

    #[test]
    fn test_empty_base_gives_empty_merge() {
        let mut merger = FeedMerger::new("K");
        let base = merger.parse_fixed("", None, "");
        let extra = merger.parse_fixed("K\tqty\nB\t9\n", None, "stock");
        let merged = merger.merge(base, vec![extra]);
        assert!(merged.is_empty());
        assert_eq!(merger.to_csv(&merged), "");
    }
}
