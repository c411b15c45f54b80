// ==========================================
// Patient Registry - patient API
// ==========================================
// Search, detail, manual registration, editing, deletion and dashboard figures.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::conflict::DataConflict;
use crate::domain::patient::{NewPatient, PatientAttributes, PatientFilter, PatientRecord};
use crate::importer::find_duplicate;
use crate::repository::{PatientRepository, PatientStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const DASHBOARD_RECENT_LIMIT: usize = 10;

/// Patient record with its conflict history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDetail {
    pub patient: PatientRecord,
    pub pending_conflicts: Vec<DataConflict>,
    pub closed_conflicts: Vec<DataConflict>,
}

/// Result of a manual registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "patient", rename_all = "snake_case")]
pub enum CreatePatientOutcome {
    Created(PatientRecord),
    /// Same identity already stored; nothing written
    AlreadyExists(PatientRecord),
}

impl CreatePatientOutcome {
    pub fn patient(&self) -> &PatientRecord {
        match self {
            CreatePatientOutcome::Created(p) | CreatePatientOutcome::AlreadyExists(p) => p,
        }
    }
}

/// Dashboard figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_patients: i64,
    pub pending_conflicts: i64,
    pub recent_patients: Vec<PatientRecord>,
}

/// Patient API
pub struct PatientApi {
    patient_repo: Arc<PatientRepository>,
    config: Arc<ConfigManager>,
}

impl PatientApi {
    pub fn new(patient_repo: Arc<PatientRepository>, config: Arc<ConfigManager>) -> Self {
        Self {
            patient_repo,
            config,
        }
    }

    /// Search patients (AND of the given criteria), newest first
    pub fn search_patients(&self, filter: &PatientFilter) -> ApiResult<Vec<PatientRecord>> {
        let limit = self.config.get_patient_list_limit()?;
        Ok(self.patient_repo.search_patients(filter, limit)?)
    }

    pub fn get_patient(&self, patient_id: i64) -> ApiResult<PatientRecord> {
        self.patient_repo
            .get_patient(patient_id)?
            .ok_or_else(|| ApiError::NotFound(format!("patient (id={})", patient_id)))
    }

    /// Patient plus its conflicts split into pending and closed
    pub fn get_patient_detail(&self, patient_id: i64) -> ApiResult<PatientDetail> {
        let patient = self.get_patient(patient_id)?;
        let (pending_conflicts, closed_conflicts): (Vec<_>, Vec<_>) = self
            .patient_repo
            .list_conflicts_for_patient(patient_id)?
            .into_iter()
            .partition(|c| c.is_pending());

        Ok(PatientDetail {
            patient,
            pending_conflicts,
            closed_conflicts,
        })
    }

    /// Register a patient by hand.
    ///
    /// # Returns
    /// - Created: new record with its unique identifier
    /// - AlreadyExists: a stored patient matches the identity; left untouched
    pub fn create_patient(&self, patient: &NewPatient) -> ApiResult<CreatePatientOutcome> {
        let identity = &patient.identity;
        if identity.nome_paciente.trim().is_empty() {
            return Err(ApiError::InvalidInput("nome_paciente is required".to_string()));
        }
        if identity.nome_mae.trim().is_empty() {
            return Err(ApiError::InvalidInput("nome_mae is required".to_string()));
        }

        let existing = find_duplicate(
            self.patient_repo.as_ref(),
            &identity.nome_paciente,
            identity.data_nascimento,
            &identity.nome_mae,
        )?;
        if let Some(found) = existing {
            warn!(id_unico = %found.record.id_unico, "patient already registered");
            return Ok(CreatePatientOutcome::AlreadyExists(found.record));
        }

        let prefix = self.config.get_unique_id_prefix()?;
        let created = self.patient_repo.insert_patient(patient, &prefix)?;
        info!(id_unico = %created.id_unico, "patient registered");
        Ok(CreatePatientOutcome::Created(created))
    }

    /// Replace a patient's attributes. Name, birth date and mother are not editable.
    pub fn update_patient(
        &self,
        patient_id: i64,
        attributes: &PatientAttributes,
    ) -> ApiResult<PatientRecord> {
        let updated = self
            .patient_repo
            .update_attributes(patient_id, attributes)?
            .ok_or_else(|| ApiError::NotFound(format!("patient (id={})", patient_id)))?;
        info!(id_unico = %updated.id_unico, "patient updated");
        Ok(updated)
    }

    /// Delete a patient together with its conflicts
    pub fn delete_patient(&self, patient_id: i64) -> ApiResult<()> {
        if !self.patient_repo.delete_patient(patient_id)? {
            return Err(ApiError::NotFound(format!("patient (id={})", patient_id)));
        }
        info!(patient_id, "patient deleted");
        Ok(())
    }

    pub fn dashboard_stats(&self) -> ApiResult<DashboardStats> {
        Ok(DashboardStats {
            total_patients: self.patient_repo.count_patients()?,
            pending_conflicts: self.patient_repo.count_pending_conflicts()?,
            recent_patients: self.patient_repo.recent_patients(DASHBOARD_RECENT_LIMIT)?,
        })
    }

    /// Distinct project ids, for filter pick-lists
    pub fn list_projects(&self) -> ApiResult<Vec<String>> {
        Ok(self.patient_repo.list_projects()?)
    }
}
