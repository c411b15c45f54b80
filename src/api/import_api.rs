// ==========================================
// Patient Registry - import API
// ==========================================
// Wraps the importer and the conflict review queue for callers
// (CLI, tests). Arguments arrive as plain labels and are validated here.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::conflict::{ConflictView, DataConflict, ResolutionOutcome, ResolutionRequest};
use crate::domain::import::{ImportBatch, ImportReport, ImportSummary};
use crate::domain::types::ResolutionChoice;
use crate::importer::{parse_kind_selector, ConflictResolver, PatientImporter, Sheet};
use crate::repository::{ImportBatchRepository, PatientRepository};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Pending conflicts of one patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientConflictGroup {
    pub patient_id: i64,
    pub id_unico: String,
    pub nome_paciente: String,
    pub conflicts: Vec<DataConflict>,
}

/// Batch resolution response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResolveResponse {
    /// Decisions applied
    pub success_count: usize,
    /// Decisions skipped (unknown id, already closed, ...)
    pub fail_count: usize,
    /// Per-item outcome, in request order
    pub outcomes: Vec<ResolutionOutcome>,
}

/// Import API
pub struct ImportApi {
    patient_repo: Arc<PatientRepository>,
    batch_repo: Arc<ImportBatchRepository>,
    config: Arc<ConfigManager>,
    importer: PatientImporter<Arc<ConfigManager>>,
    resolver: ConflictResolver,
}

impl ImportApi {
    pub fn new(
        patient_repo: Arc<PatientRepository>,
        batch_repo: Arc<ImportBatchRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        let importer = PatientImporter::new(
            patient_repo.clone(),
            Arc::clone(&batch_repo),
            Arc::clone(&config),
        );
        let resolver = ConflictResolver::new(patient_repo.clone());
        Self {
            patient_repo,
            batch_repo,
            config,
            importer,
            resolver,
        }
    }

    fn operator_or_default(&self, operator: Option<&str>) -> ApiResult<String> {
        match operator.map(str::trim).filter(|o| !o.is_empty()) {
            Some(o) => Ok(o.to_string()),
            None => Ok(self.config.get_default_operator()?),
        }
    }

    /// Import a CSV/Excel file.
    ///
    /// # Parameters
    /// - record_kind: `amostras` / `bioinformatica` / `dados_clinicos` / `auto`; None uses configuration
    /// - create_conflicts: false overwrites differing values instead of queuing conflicts
    /// - imported_by: operator recorded on the batch
    ///
    /// # Returns
    /// - Ok(ImportSummary): batch row plus per-row report
    /// - Err(ApiError::InvalidInput): unknown record kind, nothing imported
    pub fn import_file(
        &self,
        file_path: &str,
        record_kind: Option<&str>,
        create_conflicts: Option<bool>,
        imported_by: Option<&str>,
    ) -> ApiResult<ImportSummary> {
        let selector = record_kind.map(parse_kind_selector).transpose()?;
        let path = Path::new(file_path);
        if !path.exists() {
            return Err(ApiError::NotFound(format!("file {}", file_path)));
        }

        let summary = self
            .importer
            .import_file(path, selector, create_conflicts, imported_by)?;
        Ok(summary)
    }

    /// Import rows already held in memory
    pub fn import_sheet(
        &self,
        sheet: &Sheet,
        record_kind: &str,
        create_conflicts: bool,
    ) -> ApiResult<ImportReport> {
        Ok(self
            .importer
            .import_sheet_with_label(sheet, record_kind, create_conflicts)?)
    }

    /// Review queue: pending conflicts grouped by patient.
    ///
    /// Groups follow the order of their newest conflict.
    pub fn list_pending_conflicts(&self, patient_id: Option<i64>) -> ApiResult<Vec<PatientConflictGroup>> {
        let limit = self.config.get_pending_conflict_limit()?;
        let views = self.patient_repo.list_pending_conflicts(patient_id, limit)?;
        Ok(group_by_patient(views))
    }

    /// Resolve one conflict with `existing` / `new` (also `existente` / `novo`)
    pub fn resolve_conflict(
        &self,
        conflict_id: i64,
        choice: &str,
        resolved_by: Option<&str>,
    ) -> ApiResult<DataConflict> {
        let choice = parse_choice(choice)?;
        let resolver = self.operator_or_default(resolved_by)?;
        Ok(self.resolver.apply_resolution(conflict_id, choice, &resolver)?)
    }

    /// Dismiss one conflict, keeping the stored value
    pub fn ignore_conflict(&self, conflict_id: i64, resolved_by: Option<&str>) -> ApiResult<DataConflict> {
        let resolver = self.operator_or_default(resolved_by)?;
        Ok(self.resolver.ignore_conflict(conflict_id, &resolver)?)
    }

    /// Apply several decisions; failures are reported per item.
    pub fn resolve_conflicts(
        &self,
        requests: &[ResolutionRequest],
        resolved_by: Option<&str>,
    ) -> ApiResult<BatchResolveResponse> {
        if requests.is_empty() {
            return Err(ApiError::InvalidInput("no resolutions given".to_string()));
        }
        let resolver = self.operator_or_default(resolved_by)?;
        let outcomes = self.resolver.apply_resolutions(requests, &resolver);
        let success_count = outcomes.iter().filter(|o| o.applied).count();
        let fail_count = outcomes.len() - success_count;

        info!(success_count, fail_count, "batch resolution finished");
        Ok(BatchResolveResponse {
            success_count,
            fail_count,
            outcomes,
        })
    }

    /// Import history, newest first
    pub fn list_batches(&self, limit: usize) -> ApiResult<Vec<ImportBatch>> {
        Ok(self.batch_repo.list_batches(limit.clamp(1, 500))?)
    }

    pub fn get_batch(&self, batch_id: &str) -> ApiResult<ImportBatch> {
        self.batch_repo
            .get_batch(batch_id)?
            .ok_or_else(|| ApiError::NotFound(format!("import batch {}", batch_id)))
    }
}

fn parse_choice(raw: &str) -> ApiResult<ResolutionChoice> {
    raw.parse::<ResolutionChoice>().map_err(|_| {
        ApiError::InvalidInput(format!(
            "invalid resolution choice: {} (expected existing/new)",
            raw
        ))
    })
}

fn group_by_patient(views: Vec<ConflictView>) -> Vec<PatientConflictGroup> {
    let mut groups: Vec<PatientConflictGroup> = Vec::new();
    for view in views {
        let patient_id = view.conflict.patient_id;
        match groups.iter_mut().find(|g| g.patient_id == patient_id) {
            Some(group) => group.conflicts.push(view.conflict),
            None => groups.push(PatientConflictGroup {
                patient_id,
                id_unico: view.id_unico,
                nome_paciente: view.nome_paciente,
                conflicts: vec![view.conflict],
            }),
        }
    }
    groups
}
