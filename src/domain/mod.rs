// ==========================================
// Patient Registry - domain layer
// ==========================================
// Entities and value types only: no data access, no import logic.
// ==========================================

pub mod conflict;
pub mod import;
pub mod patient;
pub mod types;

pub use conflict::{
    ConflictView, DataConflict, NewConflict, ResolutionOutcome, ResolutionRequest,
};
pub use import::{
    ImportBatch, ImportReport, ImportSummary, RejectKind, RowDetail, RowOutcome, RowStatus,
};
pub use patient::{
    CandidateRecord, FieldCategory, NewPatient, PatientAttributes, PatientField, PatientFilter,
    PatientIdentity, PatientRecord,
};
pub use types::{ConflictStatus, KindSelector, RecordKind, ResolutionChoice};
