// ==========================================
// Patient Registry - PatientStore trait
// ==========================================
// The seam the import engine and the resolver depend on.
// Implementor: PatientRepository (rusqlite)
// No business rules here: lookups and atomic writes only.
// ==========================================

use crate::domain::conflict::{DataConflict, NewConflict};
use crate::domain::patient::{NewPatient, PatientRecord};
use crate::domain::types::ConflictStatus;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;

// ==========================================
// ConflictClosure - terminal state written by the resolver
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictClosure {
    pub status: ConflictStatus,
    pub chosen_value: Option<String>,
    pub resolved_by: String,
}

pub trait PatientStore: Send + Sync {
    // ===== patients =====

    /// Every patient born on `birth_date`, ordered by storage id
    fn find_by_birth_date(&self, birth_date: NaiveDate) -> RepositoryResult<Vec<PatientRecord>>;

    fn get_patient(&self, patient_id: i64) -> RepositoryResult<Option<PatientRecord>>;

    /// Insert a new patient and assign `id_unico = prefix + id`
    /// in the same transaction.
    fn insert_patient(
        &self,
        patient: &NewPatient,
        unique_id_prefix: &str,
    ) -> RepositoryResult<PatientRecord>;

    /// Persist the outcome of one merged row atomically.
    ///
    /// # Parameters
    /// - record: in-memory copy after the merge
    /// - write_record: whether any attribute changed
    /// - conflicts: conflicts detected for the row
    ///
    /// # Returns
    /// - the stored record and the stored conflicts, or an error after rollback
    fn commit_merge(
        &self,
        record: &PatientRecord,
        write_record: bool,
        conflicts: &[NewConflict],
    ) -> RepositoryResult<(PatientRecord, Vec<DataConflict>)>;

    // ===== conflicts =====

    fn get_conflict(&self, conflict_id: i64) -> RepositoryResult<Option<DataConflict>>;

    /// Move a pending conflict to a terminal state, optionally writing the
    /// owning record in the same transaction.
    ///
    /// # Returns
    /// - Ok(Some(conflict)): closed
    /// - Ok(None): conflict no longer pending, nothing written
    fn close_conflict(
        &self,
        conflict_id: i64,
        closure: &ConflictClosure,
        record_update: Option<&PatientRecord>,
    ) -> RepositoryResult<Option<DataConflict>>;
}
