// ==========================================
// Patient Registry - core library
// ==========================================
// Imports research spreadsheets (samples, bioinformatics, clinical)
// into one record per patient; value disagreements are queued as
// conflicts for a human to resolve.
// Stack: Rust + SQLite
// ==========================================

// ==========================================
// modules
// ==========================================

// domain - entities and types
pub mod domain;

// repository - data access
pub mod repository;

// importer - sheet reading, mapping, matching, merging
pub mod importer;

// config - runtime settings
pub mod config;

// database infrastructure (PRAGMAs, schema)
pub mod db;

// logging
pub mod logging;

// API - entry points for callers
pub mod api;

// application wiring
pub mod app;

// ==========================================
// re-exports
// ==========================================

pub use domain::{
    ConflictStatus, DataConflict, ImportBatch, ImportReport, ImportSummary, KindSelector,
    NewPatient, PatientAttributes, PatientField, PatientFilter, PatientIdentity, PatientRecord,
    RecordKind, ResolutionChoice, RowOutcome, RowStatus,
};

pub use importer::{ConflictResolver, MergeEngine, PatientImporter};

pub use api::{ApiError, ImportApi, PatientApi};

pub use app::AppState;

// ==========================================
// constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Patient Registry";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
