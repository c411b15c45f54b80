// ==========================================
// Patient Registry - value normalizer
// ==========================================
// Raw cell -> canonical value.
// Never fails: anything unusable becomes None.
// ==========================================

use crate::domain::patient::ISO_DATE_FORMAT;
use crate::importer::cell::{is_null_marker, CellValue};
use chrono::NaiveDate;

/// Text date formats, tried in order; first success wins
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// Normalized - three-way boundary value
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Column not present in the row
    Absent,
    /// Column present, cell empty / whitespace / NaN / null marker
    Blank,
    /// Trimmed text form of the value
    Present(String),
}

impl Normalized {
    pub fn into_option(self) -> Option<String> {
        match self {
            Normalized::Present(value) => Some(value),
            Normalized::Absent | Normalized::Blank => None,
        }
    }
}

/// Normalize a cell that may be missing from the row
pub fn normalize_cell(cell: Option<&CellValue>) -> Normalized {
    let cell = match cell {
        None => return Normalized::Absent,
        Some(cell) => cell,
    };

    let text = match cell {
        CellValue::Empty => return Normalized::Blank,
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Int(i) => i.to_string(),
        CellValue::Float(f) if f.is_nan() => return Normalized::Blank,
        // Display already gives the shortest round-trip form (10.0 -> "10")
        CellValue::Float(f) => f.to_string(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Date(d) => d.format(ISO_DATE_FORMAT).to_string(),
        CellValue::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
    };

    if text.is_empty() || is_null_marker(&text) {
        Normalized::Blank
    } else {
        Normalized::Present(text)
    }
}

/// Scalar form of a cell, or None when missing/blank
pub fn normalize_scalar(cell: Option<&CellValue>) -> Option<String> {
    normalize_cell(cell).into_option()
}

/// Date form of a cell.
///
/// Typed dates and datetimes pass through; text is trimmed and tried
/// against `DATE_FORMATS`. Numbers, booleans and unparseable text give None.
pub fn normalize_date(cell: Option<&CellValue>) -> Option<NaiveDate> {
    match cell? {
        CellValue::Date(d) => Some(*d),
        CellValue::DateTime(dt) => Some(dt.date()),
        CellValue::Text(s) => parse_date_text(s),
        CellValue::Empty | CellValue::Int(_) | CellValue::Float(_) | CellValue::Bool(_) => None,
    }
}

/// Parse free text against the accepted date formats
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}
