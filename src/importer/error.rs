// ==========================================
// Patient Registry - importer errors
// ==========================================
// Structural failures only. Per-row problems never surface here:
// they become RowOutcome::Rejected.
// Tooling: thiserror derive
// ==========================================

use crate::domain::types::ConflictStatus;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// Errors that abort a whole import
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== file =====
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file format: {0} (expected .xlsx/.xls/.csv)")]
    UnsupportedFormat(String),

    #[error("file read failed: {0}")]
    FileReadError(String),

    #[error("Excel parse failed: {0}")]
    ExcelParseError(String),

    #[error("CSV parse failed: {0}")]
    CsvParseError(String),

    #[error("sheet has no header row")]
    MissingHeader,

    // ===== request =====
    #[error("unknown record kind: {0} (expected amostras, bioinformatica, dados_clinicos or auto)")]
    UnknownRecordKind(String),

    // ===== storage / config =====
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result alias
pub type ImportResult<T> = Result<T, ImportError>;

// ==========================================
// ResolutionError - conflict resolution failures
// ==========================================
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("conflict not found: id={0}")]
    ConflictNotFound(i64),

    #[error("conflict {conflict_id} is not pending (status={status}, requested={requested})")]
    NotPending {
        conflict_id: i64,
        status: ConflictStatus,
        requested: ConflictStatus,
    },

    #[error("patient not found: id={0}")]
    PatientNotFound(i64),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

pub type ResolutionResult<T> = Result<T, ResolutionError>;
