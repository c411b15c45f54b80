// ==========================================
// Patient Registry - import layer
// ==========================================
// Spreadsheet rows -> unified patient records
// Supports: Excel, CSV
// ==========================================

pub mod cell;
pub mod conflict_resolver;
pub mod duplicate_matcher;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod merge_engine;
pub mod patient_importer;
pub mod patient_importer_trait;
pub mod schema_detector;
pub mod value_normalizer;

pub use cell::{CellValue, RawRow, Sheet, SheetRow};
pub use conflict_resolver::ConflictResolver;
pub use duplicate_matcher::{find_duplicate, DuplicateMatch, MatchResolution};
pub use error::{ImportError, ImportResult, ResolutionError, ResolutionResult};
pub use field_mapper::ColumnMapper;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use merge_engine::{merge_attributes, MergeEngine, MergePlan};
pub use patient_importer::{parse_kind_selector, PatientImporter};
pub use patient_importer_trait::{FieldMapper, FileParser};
pub use schema_detector::{detect_record_kind, DetectionScores};
pub use value_normalizer::{normalize_cell, normalize_date, normalize_scalar, Normalized};
