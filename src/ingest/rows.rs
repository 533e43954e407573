//! Row tokenization
//!
//! Turns decoded feed text into a header list plus dict-shaped rows keyed by
//! normalized (trimmed, lowercased) header names. Arbitrary source columns
//! stay strings end to end; only the mapping engine widens values into typed
//! target fields.

use std::collections::HashMap;

/// A tokenized feed: ordered headers plus one map per data row
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    /// Headers exactly as written in the file, trimmed
    pub headers: Vec<String>,
    /// normalized header -> column index
    pub header_index: HashMap<String, usize>,
    /// Raw cell lists, one per data row, in file order
    pub rows: Vec<Vec<String>>,
}

impl RowSet {
    /// Tokenize `text`. Single-character delimiters go through the csv
    /// crate; multi-character delimiters (up to 5 chars, e.g. "||") are
    /// split manually. Headerless feeds get synthetic `col_N` headers from
    /// the first data row's width.
    pub fn parse(text: &str, delimiter: &str, has_header: bool) -> Self {
        let mut set = RowSet::default();
        if text.is_empty() {
            return set;
        }

        let mut records: Vec<Vec<String>> = Vec::new();
        if delimiter.chars().count() == 1 {
            let delim_byte = delimiter.bytes().next().unwrap_or(b';');
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(delim_byte)
                .has_headers(false)
                .flexible(true)
                .from_reader(text.as_bytes());
            for record in reader.records().flatten() {
                records.push(record.iter().map(|c| c.trim().to_string()).collect());
            }
        } else {
            for line in text.lines() {
                let line = line.trim_end_matches('\r');
                if line.is_empty() {
                    continue;
                }
                records.push(line.split(delimiter).map(|c| c.trim().to_string()).collect());
            }
        }

        if records.is_empty() {
            return set;
        }

        if has_header {
            set.headers = records.remove(0);
        } else {
            let width = records.first().map(Vec::len).unwrap_or(0);
            set.headers = (1..=width).map(|i| format!("col_{}", i)).collect();
        }

        for (idx, header) in set.headers.iter().enumerate() {
            set.header_index.insert(normalize_header(header), idx);
        }
        set.rows = records;
        set
    }

    /// Column index for a header, matched case-insensitively
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header_index.get(&normalize_header(name)).copied()
    }

    /// Cell value of `row` under `header`, empty string when absent
    pub fn cell<'a>(&self, row: &'a [String], header: &str) -> &'a str {
        self.column(header)
            .and_then(|idx| row.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// A row as a {header: value} map, for raw-data preservation
    pub fn row_as_map(&self, row: &[String]) -> HashMap<String, String> {
        self.headers
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                (
                    h.clone(),
                    row.get(idx).cloned().unwrap_or_default(),
                )
            })
            .collect()
    }
}

pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Guess the delimiter from a sample of the feed: the candidate among
/// `, ; | \t` with the most occurrences on the first non-empty line wins.
/// Falls back to `;`.
pub fn sniff_delimiter(text: &str) -> String {
    let sample: String = text.chars().take(4096).collect();
    let first_line = sample.lines().find(|l| !l.trim().is_empty()).unwrap_or("");

    let mut best = ';';
    let mut best_count = 0;
    for candidate in [',', ';', '|', '\t'] {
        let count = first_line.matches(candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_semicolon_with_header() {
        let set = RowSet::parse("EAN;Name;Price\n123;Widget;9.99\n", ";", true);
        assert_eq!(set.headers, vec!["EAN", "Name", "Price"]);
        assert_eq!(set.rows.len(), 1);
        assert_eq!(set.cell(&set.rows[0], "name"), "Widget");
    }

    #[test]
    fn test_parse_case_insensitive_header_lookup() {
        let set = RowSet::parse("Ean ;NAME\n123;x\n", ";", true);
        assert_eq!(set.cell(&set.rows[0], "ean"), "123");
        assert_eq!(set.cell(&set.rows[0], "Name"), "x");
    }

    #[test]
    fn test_parse_multichar_delimiter() {
        let set = RowSet::parse("A||B\n1||2\n", "||", true);
        assert_eq!(set.headers, vec!["A", "B"]);
        assert_eq!(set.cell(&set.rows[0], "b"), "2");
    }

    #[test]
    fn test_parse_headerless_synthesizes_columns() {
        let set = RowSet::parse("123;Widget\n456;Gadget\n", ";", false);
        assert_eq!(set.headers, vec!["col_1", "col_2"]);
        assert_eq!(set.rows.len(), 2);
        assert_eq!(set.cell(&set.rows[1], "col_1"), "456");
    }

    #[test]
    fn test_parse_ragged_rows_tolerated() {
        let set = RowSet::parse("A;B;C\n1;2\n", ";", true);
        assert_eq!(set.cell(&set.rows[0], "c"), "");
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), ";");
        assert_eq!(sniff_delimiter("a,b,c\n"), ",");
        assert_eq!(sniff_delimiter("a\tb\tc\n"), "\t");
        assert_eq!(sniff_delimiter("nodelimiter\n"), ";");
    }
}
