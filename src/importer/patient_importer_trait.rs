// ==========================================
// Patient Registry - importer seams
// ==========================================
// Pipeline: parse -> detect kind -> map -> merge -> report
// Each stage behind a trait so tests can swap it.
// ==========================================

use crate::domain::patient::CandidateRecord;
use crate::domain::types::RecordKind;
use crate::importer::cell::{RawRow, Sheet};
use crate::importer::error::ImportResult;
use std::path::Path;

// ==========================================
// FileParser
// ==========================================
// Implementors: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// Read the first sheet of a file.
    ///
    /// # Returns
    /// - Ok(Sheet): header labels (trimmed) and non-blank data rows
    /// - Err: missing file, unsupported extension, unreadable content
    fn parse_sheet(&self, file_path: &Path) -> ImportResult<Sheet>;
}

// ==========================================
// FieldMapper
// ==========================================
// Implementor: ColumnMapper
pub trait FieldMapper: Send + Sync {
    /// Map one raw row of a `kind` sheet to a normalized candidate.
    ///
    /// Never fails: unknown columns are ignored, missing ones stay None.
    fn map_row(&self, kind: RecordKind, row: &RawRow) -> CandidateRecord;
}
