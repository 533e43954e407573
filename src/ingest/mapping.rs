//! Column mapping & transform engine
//!
//! Resolves a mapping template against one tokenized row and produces the
//! {target_field: value} map the reconciliation engine consumes. Each line
//! resolves independently; a `required_field` line with an empty resolved
//! value rejects the whole row.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::ingest::rows::RowSet;
use crate::models::enums::{TransformType, UpdateMode};
use crate::models::MappingLine;

/// Virtual source column: cleaned file stem (letters and digits only)
pub const VIRTUAL_REF_CLEAN: &str = "ref_clean";
/// Virtual source column: import date
pub const VIRTUAL_TODAY: &str = "date_du_jour";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("required field '{field}' is empty (source column '{column}')")]
    MissingRequiredField { field: String, column: String },
}

/// Output of the engine for one row: target field -> resolved value, plus
/// the per-field update mode for the commit step
#[derive(Debug, Clone, Default)]
pub struct MappedRow {
    pub values: BTreeMap<String, String>,
    pub update_modes: BTreeMap<String, UpdateMode>,
}

impl MappedRow {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn update_mode(&self, field: &str) -> UpdateMode {
        self.update_modes.get(field).copied().unwrap_or_default()
    }
}

/// Mapping engine bound to one template's active lines
pub struct MappingEngine {
    lines: Vec<MappingLine>,
    ref_clean: String,
    today: NaiveDate,
}

impl MappingEngine {
    /// Build the engine. `file_name` feeds the `ref_clean` virtual column;
    /// `today` the `date_du_jour` one. Inactive lines are dropped here so
    /// the per-row path only walks live lines.
    pub fn new(lines: Vec<MappingLine>, file_name: &str, today: NaiveDate) -> Self {
        let stem = file_name.rsplit_once('.').map(|(s, _)| s).unwrap_or(file_name);
        let ref_clean: String = stem.chars().filter(|c| c.is_ascii_alphanumeric()).collect();

        let mut lines: Vec<MappingLine> = lines.into_iter().filter(|l| l.active).collect();
        lines.sort_by_key(|l| (l.sequence, l.id));

        Self { lines, ref_clean, today }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Map one row. Fails only on a required-field violation; all other
    /// anomalies degrade to omitted fields.
    pub fn map_row(&self, set: &RowSet, row: &[String]) -> Result<MappedRow, MappingError> {
        let mut mapped = MappedRow::default();

        for line in &self.lines {
            let raw = self.source_value(set, row, &line.source_column);
            let value = self.apply_transform(line, raw, set, row);
            let value = value.trim().to_string();

            if value.is_empty() {
                if line.required_field {
                    return Err(MappingError::MissingRequiredField {
                        field: line.target_field.clone(),
                        column: line.source_column.clone(),
                    });
                }
                if line.skip_if_empty {
                    continue;
                }
            }

            mapped
                .update_modes
                .insert(line.target_field.clone(), UpdateMode::parse(&line.update_mode));
            mapped.values.insert(line.target_field.clone(), value);
        }

        Ok(mapped)
    }

    fn source_value(&self, set: &RowSet, row: &[String], column: &str) -> String {
        let name = column.trim();
        if name.eq_ignore_ascii_case(VIRTUAL_REF_CLEAN) {
            return self.ref_clean.clone();
        }
        if name.eq_ignore_ascii_case(VIRTUAL_TODAY) || name.eq_ignore_ascii_case("today") {
            return self.today.format("%Y-%m-%d").to_string();
        }
        set.cell(row, name).to_string()
    }

    fn apply_transform(&self, line: &MappingLine, value: String, set: &RowSet, row: &[String]) -> String {
        let param1 = line.transform_value.as_deref().unwrap_or("");
        let param2 = line.transform_value2.as_deref().unwrap_or("");

        match TransformType::parse(&line.transform_type) {
            TransformType::None => value,
            TransformType::Strip => value.trim().to_string(),
            TransformType::Upper => value.to_uppercase(),
            TransformType::Lower => value.to_lowercase(),
            TransformType::Replace => value.replace(param1, param2),
            // Literal ignores the source entirely and emits a constant
            TransformType::Literal => param1.to_string(),
            TransformType::DefaultIfEmpty => {
                if value.trim().is_empty() {
                    param1.to_string()
                } else {
                    value
                }
            }
            TransformType::Divide => apply_arith(&value, param1, |v, p| if p != 0.0 { v / p } else { 0.0 }),
            TransformType::Multiply => apply_arith(&value, param1, |v, p| v * p),
            TransformType::Concat => {
                let separator = &line.concat_separator;
                let mut parts: Vec<String> = Vec::new();
                if !value.trim().is_empty() {
                    parts.push(value.trim().to_string());
                }
                // concat_column accepts several columns separated by ; or ,
                let columns = line.concat_column.as_deref().unwrap_or("");
                for col in columns.replace(',', ";").split(';') {
                    let col = col.trim();
                    if col.is_empty() {
                        continue;
                    }
                    let extra = self.source_value(set, row, col);
                    let extra = extra.trim();
                    if !extra.is_empty() {
                        parts.push(extra.to_string());
                    }
                }
                parts.join(separator)
            }
        }
    }
}

fn apply_arith(value: &str, param: &str, op: impl Fn(f64, f64) -> f64) -> String {
    let parsed = value.trim().replace(',', ".").parse::<f64>();
    let factor = param.trim().parse::<f64>();
    match (parsed, factor) {
        (Ok(v), Ok(p)) => {
            let result = op(v, p);
            // Keep a stable plain-decimal rendering
            if result.fract() == 0.0 {
                format!("{:.0}", result)
            } else {
                result.to_string()
            }
        }
        // Unparseable input passes through untouched
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(source: &str, target: &str) -> MappingLine {
        MappingLine {
            id: 1,
            template_id: 1,
            sequence: 10,
            source_column: source.to_string(),
            target_field: target.to_string(),
            transform_type: "none".to_string(),
            transform_value: None,
            transform_value2: None,
            concat_column: None,
            concat_separator: " ".to_string(),
            skip_if_empty: true,
            required_field: false,
            update_mode: "replace".to_string(),
            active: true,
            notes: None,
        }
    }

    fn rowset(text: &str) -> RowSet {
        RowSet::parse(text, ";", true)
    }

    fn engine(lines: Vec<MappingLine>) -> MappingEngine {
        MappingEngine::new(lines, "tarif_2025.csv", NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
    }

    #[test]
    fn test_passthrough_mapping() {
        let set = rowset("EAN;Libelle\n123;Widget\n");
        let eng = engine(vec![line("ean", "barcode"), line("Libelle", "name")]);
        let mapped = eng.map_row(&set, &set.rows[0]).unwrap();
        assert_eq!(mapped.get("barcode"), Some("123"));
        assert_eq!(mapped.get("name"), Some("Widget"));
    }

    #[test]
    fn test_skip_if_empty_omits_field() {
        let set = rowset("EAN;Desc\n123;\n");
        let eng = engine(vec![line("EAN", "barcode"), line("Desc", "description")]);
        let mapped = eng.map_row(&set, &set.rows[0]).unwrap();
        assert!(mapped.get("description").is_none());
    }

    #[test]
    fn test_empty_written_when_skip_if_empty_off() {
        let set = rowset("EAN;Desc\n123;\n");
        let mut desc = line("Desc", "description");
        desc.skip_if_empty = false;
        let eng = engine(vec![desc]);
        let mapped = eng.map_row(&set, &set.rows[0]).unwrap();
        assert_eq!(mapped.get("description"), Some(""));
    }

    #[test]
    fn test_required_field_rejects_row() {
        let set = rowset("EAN;Name\n;Widget\n");
        let mut ean = line("EAN", "barcode");
        ean.required_field = true;
        let eng = engine(vec![ean]);
        let err = eng.map_row(&set, &set.rows[0]).unwrap_err();
        assert_eq!(
            err,
            MappingError::MissingRequiredField {
                field: "barcode".to_string(),
                column: "EAN".to_string()
            }
        );
    }

    #[test]
    fn test_transform_upper_and_replace() {
        let set = rowset("Marque;Prix\nsamsung;1 234,56\n");
        let mut brand = line("Marque", "brand");
        brand.transform_type = "upper".to_string();
        let mut price = line("Prix", "cost_price");
        price.transform_type = "replace".to_string();
        price.transform_value = Some(" ".to_string());
        price.transform_value2 = Some("".to_string());
        let eng = engine(vec![brand, price]);
        let mapped = eng.map_row(&set, &set.rows[0]).unwrap();
        assert_eq!(mapped.get("brand"), Some("SAMSUNG"));
        assert_eq!(mapped.get("cost_price"), Some("1234,56"));
    }

    #[test]
    fn test_transform_literal_ignores_source() {
        let set = rowset("EAN\n123\n");
        let mut cur = line("EAN", "currency");
        cur.transform_type = "literal".to_string();
        cur.transform_value = Some("EUR".to_string());
        let eng = engine(vec![cur]);
        let mapped = eng.map_row(&set, &set.rows[0]).unwrap();
        assert_eq!(mapped.get("currency"), Some("EUR"));
    }

    #[test]
    fn test_transform_concat_multiple_columns() {
        let set = rowset("Nom;Ligne2;Ligne3\nTV;55 pouces;4K\n");
        let mut name = line("Nom", "name");
        name.transform_type = "concat".to_string();
        name.concat_column = Some("Ligne2;Ligne3".to_string());
        name.concat_separator = " - ".to_string();
        let eng = engine(vec![name]);
        let mapped = eng.map_row(&set, &set.rows[0]).unwrap();
        assert_eq!(mapped.get("name"), Some("TV - 55 pouces - 4K"));
    }

    #[test]
    fn test_transform_divide() {
        let set = rowset("PrixCent\n1250\n");
        let mut price = line("PrixCent", "cost_price");
        price.transform_type = "divide".to_string();
        price.transform_value = Some("100".to_string());
        let eng = engine(vec![price]);
        let mapped = eng.map_row(&set, &set.rows[0]).unwrap();
        assert_eq!(mapped.get("cost_price"), Some("12.5"));
    }

    #[test]
    fn test_virtual_ref_clean_column() {
        let set = rowset("EAN\n123\n");
        let mut r = line("ref_clean", "sku");
        r.skip_if_empty = false;
        let eng = engine(vec![r]);
        let mapped = eng.map_row(&set, &set.rows[0]).unwrap();
        assert_eq!(mapped.get("sku"), Some("tarif2025"));
    }

    #[test]
    fn test_inactive_lines_ignored() {
        let set = rowset("EAN\n123\n");
        let mut l = line("EAN", "barcode");
        l.active = false;
        let eng = engine(vec![l]);
        assert!(eng.is_empty());
        let mapped = eng.map_row(&set, &set.rows[0]).unwrap();
        assert!(mapped.values.is_empty());
    }

    #[test]
    fn test_default_if_empty() {
        let set = rowset("Qty;Ref\n;R1\n");
        let mut qty = line("Qty", "quantity");
        qty.transform_type = "default_if_empty".to_string();
        qty.transform_value = Some("0".to_string());
        let eng = engine(vec![qty]);
        let mapped = eng.map_row(&set, &set.rows[0]).unwrap();
        assert_eq!(mapped.get("quantity"), Some("0"));
    }
}
