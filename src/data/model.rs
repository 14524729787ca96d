use std::collections::BTreeMap;
use std::fmt;

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// CellValue – a single cell of an exported sheet
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as found in an instrument export.
/// Numeric coercion is deferred to the extractor so that bad cells can be
/// reported with their sheet/row/column position.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Empty => write!(f, "<empty>"),
        }
    }
}

impl CellValue {
    /// Guess the type of a textual cell (CSV, JSON strings).
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return CellValue::Empty;
        }
        match s.parse::<f64>() {
            Ok(v) => CellValue::Number(v),
            Err(_) => CellValue::Text(s.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – one sheet
// ---------------------------------------------------------------------------

/// One sheet of an export: a header row plus data rows.
/// Rows may be ragged; a missing trailing cell reads as [`CellValue::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Build a table from raw rows, dropping `skip_rows` leading rows and
    /// using the next one as the header row.
    pub fn from_rows(name: &str, rows: Vec<Vec<CellValue>>, skip_rows: usize) -> Self {
        let mut rows = rows.into_iter().skip(skip_rows);
        let headers = rows
            .next()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .unwrap_or_default();
        RawTable {
            name: name.to_string(),
            headers,
            rows: rows.collect(),
        }
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row (or header) in the table.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Read column `idx` as numbers. Any empty, textual or non-finite cell
    /// fails with a [`AnalysisError::DataFormat`] naming its position.
    pub fn numeric_column(&self, idx: usize) -> Result<Vec<f64>> {
        if idx >= self.width() {
            return Err(AnalysisError::data_format(format!(
                "sheet '{}' has {} columns, column {idx} is missing",
                self.name,
                self.width()
            )));
        }
        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                let cell = cells.get(idx).unwrap_or(&CellValue::Empty);
                match cell.as_f64() {
                    Some(v) if v.is_finite() => Ok(v),
                    Some(_) => Err(AnalysisError::data_format(format!(
                        "sheet '{}', row {row}, column {idx}: '{cell}' is not a finite number",
                        self.name
                    ))),
                    None => Err(AnalysisError::data_format(format!(
                        "sheet '{}', row {row}, column {idx}: '{cell}' is not a number",
                        self.name
                    ))),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Workbook – the complete loaded export
// ---------------------------------------------------------------------------

/// All sheets of an export, keyed by sheet name.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: BTreeMap<String, RawTable>,
}

impl Workbook {
    pub fn from_tables(tables: Vec<RawTable>) -> Self {
        Workbook {
            sheets: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    pub fn sheet(&self, name: &str) -> Result<&RawTable> {
        self.sheets.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.sheets.keys().map(String::as_str).collect();
            AnalysisError::data_format(format!(
                "no sheet named '{name}' (available: {})",
                known.join(", ")
            ))
        })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::parse(c)).collect()
    }

    #[test]
    fn from_rows_skips_title_and_takes_header() {
        let table = RawTable::from_rows(
            "R1",
            vec![row(&["Run R1"]), row(&["Time", "Temp"]), row(&["0", "25.0"])],
            1,
        );
        assert_eq!(table.headers, vec!["Time", "Temp"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.numeric_column(1).unwrap(), vec![25.0]);
    }

    #[test]
    fn numeric_column_reports_bad_cell() {
        let table = RawTable::from_rows("R1", vec![row(&["a"]), row(&["x"])], 0);
        let err = table.numeric_column(0).unwrap_err();
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn numeric_column_rejects_non_finite_cells() {
        for bad in ["NaN", "inf", "-inf"] {
            let table = RawTable::from_rows("R1", vec![row(&["a"]), row(&["1"]), row(&[bad])], 0);
            let err = table.numeric_column(0).unwrap_err();
            assert!(matches!(err, AnalysisError::DataFormat(_)));
            assert!(err.to_string().contains("row 1"));
        }
    }

    #[test]
    fn numeric_column_reports_missing_column() {
        let table = RawTable::from_rows("R1", vec![row(&["a"]), row(&["1"])], 0);
        assert!(matches!(
            table.numeric_column(4),
            Err(AnalysisError::DataFormat(_))
        ));
    }

    #[test]
    fn missing_sheet_lists_available() {
        let wb = Workbook::from_tables(vec![RawTable {
            name: "A".into(),
            ..Default::default()
        }]);
        let err = wb.sheet("B").unwrap_err().to_string();
        assert!(err.contains("available: A"));
    }
}
