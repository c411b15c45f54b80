// ==========================================
// Patient Registry - sheet cells and rows
// ==========================================
// Readers turn CSV/Excel content into these types; everything after the
// reader works on them only.
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Text cells that read as missing values (case-sensitive)
pub const NULL_MARKERS: [&str; 9] = ["NA", "N/A", "NaN", "nan", "NULL", "null", "None", "#N/A", "<NA>"];

pub fn is_null_marker(text: &str) -> bool {
    NULL_MARKERS.contains(&text)
}

/// One typed spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                trimmed.is_empty() || is_null_marker(trimmed)
            }
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

/// Column label -> cell
pub type RawRow = HashMap<String, CellValue>;

/// One data row and its physical position in the sheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub row_number: usize, // header is row 1
    pub cells: RawRow,
}

/// Parsed sheet: ordered column labels + data rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub columns: Vec<String>,
    pub rows: Vec<SheetRow>,
}

impl Sheet {
    /// Build a sheet from in-memory rows; row numbers are index + 2.
    pub fn from_rows(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, cells)| SheetRow {
                row_number: idx + 2,
                cells,
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
