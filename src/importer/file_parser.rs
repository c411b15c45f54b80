// ==========================================
// Patient Registry - sheet readers
// ==========================================
// Supports: Excel (.xlsx/.xls) / CSV (.csv)
// First worksheet only; fully blank rows are skipped but keep their
// physical row numbers out of the count (header is row 1).
// ==========================================

use crate::importer::cell::{CellValue, RawRow, Sheet, SheetRow};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::patient_importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::Timelike;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

fn check_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Build one row from header labels and positional cells.
///
/// Duplicate header labels keep the first column.
fn build_row(headers: &[String], cells: Vec<CellValue>) -> RawRow {
    let mut row: RawRow = HashMap::with_capacity(headers.len());
    for (header, cell) in headers.iter().zip(cells) {
        if header.is_empty() {
            continue;
        }
        row.entry(header.clone()).or_insert(cell);
    }
    row
}

fn warn_duplicate_headers(headers: &[String]) {
    let mut seen = std::collections::HashSet::new();
    for header in headers.iter().filter(|h| !h.is_empty()) {
        if !seen.insert(header) {
            warn!(column = %header, "duplicate column label, keeping the first one");
        }
    }
}

// ==========================================
// CSV
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_sheet(&self, file_path: &Path) -> ImportResult<Sheet> {
        check_exists(file_path)?;
        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MissingHeader);
        }
        warn_duplicate_headers(&headers);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            // csv positions are 1-based lines; header occupies line 1
            let row_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(rows.len() + 2);

            let cells: Vec<CellValue> = record.iter().map(CellValue::from).collect();
            if cells.iter().all(CellValue::is_blank) {
                continue;
            }
            rows.push(SheetRow {
                row_number,
                cells: build_row(&headers, cells),
            });
        }

        debug!(rows = rows.len(), columns = headers.len(), "CSV parsed");
        Ok(Sheet {
            columns: headers.into_iter().filter(|h| !h.is_empty()).collect(),
            rows,
        })
    }
}

// ==========================================
// Excel
// ==========================================
pub struct ExcelParser;

/// Convert a calamine cell; midnight datetimes become plain dates
fn cell_from_excel(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 => {
                CellValue::Date(dt.date())
            }
            Some(dt) => CellValue::DateTime(dt),
            None => CellValue::Text(cell.to_string()),
        },
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

impl FileParser for ExcelParser {
    fn parse_sheet(&self, file_path: &Path) -> ImportResult<Sheet> {
        check_exists(file_path)?;
        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::ExcelParseError("workbook has no worksheet".to_string()))??;

        let mut source_rows = range.rows();
        let header_row = source_rows.next().ok_or(ImportError::MissingHeader)?;
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MissingHeader);
        }
        warn_duplicate_headers(&headers);

        // range may not start at A1
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0) + 1;

        let mut rows = Vec::new();
        for (offset, data_row) in source_rows.enumerate() {
            let cells: Vec<CellValue> = data_row.iter().map(cell_from_excel).collect();
            if cells.iter().all(CellValue::is_blank) {
                continue;
            }
            rows.push(SheetRow {
                row_number: first_row + offset + 1,
                cells: build_row(&headers, cells),
            });
        }

        debug!(rows = rows.len(), columns = headers.len(), "worksheet parsed");
        Ok(Sheet {
            columns: headers.into_iter().filter(|h| !h.is_empty()).collect(),
            rows,
        })
    }
}

// ==========================================
// Dispatch by extension
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_sheet(&self, file_path: &Path) -> ImportResult<Sheet> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse_sheet(file_path),
            "xlsx" | "xls" => ExcelParser.parse_sheet(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_csv_parser_reads_header_and_rows() {
        let file = csv_file(&[
            "Nome paciente,Data de nascimento,Nome da mãe,CARS",
            "Ana,15/03/1990,Maria,10",
            "Bia,01/01/2000,Joana,",
        ]);

        let sheet = CsvParser.parse_sheet(file.path()).unwrap();
        assert_eq!(sheet.columns.len(), 4);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].row_number, 2);
        assert_eq!(
            sheet.rows[0].cells.get("Nome paciente"),
            Some(&CellValue::Text("Ana".to_string()))
        );
        assert_eq!(sheet.rows[1].cells.get("CARS"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_csv_parser_skips_blank_rows() {
        let file = csv_file(&["Nome paciente,CARS", "Ana,10", ",", "Bia,20"]);

        let sheet = CsvParser.parse_sheet(file.path()).unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1].row_number, 4);
    }

    #[test]
    fn test_missing_file_and_bad_extension() {
        let missing = CsvParser.parse_sheet(Path::new("does_not_exist.csv"));
        assert!(matches!(missing, Err(ImportError::FileNotFound(_))));

        let file = Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.parse_sheet(file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
