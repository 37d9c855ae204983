use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// A single cell, tagged so downstream formatting code can pattern-match
/// instead of guessing types at runtime.
///
/// Empty cells normalize to `Text("")` at load time; `Missing` is only ever
/// produced by numeric cleanup of unparsable values.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Missing,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Render the cell as display text. Whole numbers lose the trailing
    /// `.0` so quantities read like the sheet shows them.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Missing => String::new(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
            CellValue::Missing => true,
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            // Missing renders as the empty-string sentinel in templates
            CellValue::Missing => serializer.serialize_str(""),
        }
    }
}

/// One sheet row: a mapping from normalized column name to cell value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    cells: HashMap<String, CellValue>,
}

impl Row {
    pub fn new() -> Self {
        Row::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.cells.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Cell text for `column`, empty string when the column is absent.
    pub fn text(&self, column: &str) -> String {
        self.cells
            .get(column)
            .map(CellValue::as_text)
            .unwrap_or_default()
    }

    /// Like `text` but also trimmed, the most common access pattern.
    pub fn trimmed(&self, column: &str) -> String {
        self.text(column).trim().to_string()
    }

    /// Case-insensitive lookup over several candidate column names,
    /// returning the first non-absent match.
    pub fn text_any(&self, candidates: &[&str]) -> String {
        for key in candidates {
            let wanted = key.trim().to_lowercase();
            for (actual, value) in &self.cells {
                if actual.trim().to_lowercase() == wanted {
                    return value.as_text();
                }
            }
        }
        String::new()
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.cells.keys()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (k, v) in &self.cells {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A loaded sheet: ordered columns plus row records keyed by column name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn empty() -> Self {
        Table::default()
    }

    /// Build a table from raw header cells and row cells. Headers are
    /// whitespace-normalized; short rows are padded with empty text so every
    /// record carries every column.
    pub fn from_cells(headers: Vec<String>, data: Vec<Vec<CellValue>>) -> Self {
        let columns: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut rows = Vec::with_capacity(data.len());
        for cells in data {
            let mut row = Row::new();
            for (i, column) in columns.iter().enumerate() {
                let value = cells.get(i).cloned().unwrap_or_else(|| CellValue::text(""));
                row.insert(column.clone(), value);
            }
            rows.push(row);
        }
        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

/// Normalize a header the way every page expects: NBSP and tabs become
/// plain spaces, doubled spaces collapse, surrounding whitespace goes.
pub fn normalize_header(raw: &str) -> String {
    raw.replace('\u{00A0}', " ")
        .replace('\t', " ")
        .replace("  ", " ")
        .trim()
        .to_string()
}
