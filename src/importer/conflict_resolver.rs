// ==========================================
// Patient Registry - conflict resolution applier
// ==========================================
// pending -> resolved (existing | new) or pending -> ignored.
// A conflict that already left pending is never touched again.
// ==========================================

use crate::domain::conflict::{DataConflict, ResolutionOutcome, ResolutionRequest};
use crate::domain::patient::PatientRecord;
use crate::domain::types::{ConflictStatus, ResolutionChoice};
use crate::importer::error::{ResolutionError, ResolutionResult};
use crate::repository::patient_store::{ConflictClosure, PatientStore};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct ConflictResolver {
    store: Arc<dyn PatientStore>,
}

impl ConflictResolver {
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self { store }
    }

    fn load_pending(
        &self,
        conflict_id: i64,
        requested: ConflictStatus,
    ) -> ResolutionResult<DataConflict> {
        let conflict = self
            .store
            .get_conflict(conflict_id)?
            .ok_or(ResolutionError::ConflictNotFound(conflict_id))?;
        if !conflict.is_pending() {
            return Err(ResolutionError::NotPending {
                conflict_id,
                status: conflict.status,
                requested,
            });
        }
        Ok(conflict)
    }

    /// Close a conflict; `None` from the store means it left pending meanwhile
    fn close(
        &self,
        conflict_id: i64,
        closure: ConflictClosure,
        record_update: Option<&PatientRecord>,
    ) -> ResolutionResult<DataConflict> {
        match self.store.close_conflict(conflict_id, &closure, record_update)? {
            Some(conflict) => Ok(conflict),
            None => {
                let status = self
                    .store
                    .get_conflict(conflict_id)?
                    .map(|c| c.status)
                    .ok_or(ResolutionError::ConflictNotFound(conflict_id))?;
                Err(ResolutionError::NotPending {
                    conflict_id,
                    status,
                    requested: closure.status,
                })
            }
        }
    }

    /// Apply a keep-existing / adopt-new decision.
    ///
    /// # Returns
    /// - Ok(conflict): now `resolved`, with chosen value and resolver
    /// - Err(NotPending): already resolved or ignored, nothing changed
    #[instrument(skip(self))]
    pub fn apply_resolution(
        &self,
        conflict_id: i64,
        choice: ResolutionChoice,
        resolver: &str,
    ) -> ResolutionResult<DataConflict> {
        let conflict = self.load_pending(conflict_id, ConflictStatus::Resolved)?;

        let resolved = match choice {
            ResolutionChoice::Existing => self.close(
                conflict_id,
                ConflictClosure {
                    status: ConflictStatus::Resolved,
                    chosen_value: Some(conflict.existing_value.clone()),
                    resolved_by: resolver.to_string(),
                },
                None,
            )?,
            ResolutionChoice::New => {
                let mut record = self
                    .store
                    .get_patient(conflict.patient_id)?
                    .ok_or(ResolutionError::PatientNotFound(conflict.patient_id))?;
                conflict
                    .field
                    .set(&mut record.attributes, Some(conflict.new_value.clone()));
                self.close(
                    conflict_id,
                    ConflictClosure {
                        status: ConflictStatus::Resolved,
                        chosen_value: Some(conflict.new_value.clone()),
                        resolved_by: resolver.to_string(),
                    },
                    Some(&record),
                )?
            }
        };

        info!(
            conflict_id = conflict_id,
            patient_id = resolved.patient_id,
            field = %resolved.field,
            choice = %choice,
            "conflict resolved"
        );
        Ok(resolved)
    }

    /// Dismiss a pending conflict without touching the record
    #[instrument(skip(self))]
    pub fn ignore_conflict(&self, conflict_id: i64, resolver: &str) -> ResolutionResult<DataConflict> {
        self.load_pending(conflict_id, ConflictStatus::Ignored)?;
        let ignored = self.close(
            conflict_id,
            ConflictClosure {
                status: ConflictStatus::Ignored,
                chosen_value: None,
                resolved_by: resolver.to_string(),
            },
            None,
        )?;
        info!(conflict_id = conflict_id, "conflict ignored");
        Ok(ignored)
    }

    /// Apply many decisions in the given order; one failure does not stop the rest.
    pub fn apply_resolutions(
        &self,
        requests: &[ResolutionRequest],
        resolver: &str,
    ) -> Vec<ResolutionOutcome> {
        requests
            .iter()
            .map(|request| {
                match self.apply_resolution(request.conflict_id, request.choice, resolver) {
                    Ok(_) => ResolutionOutcome {
                        conflict_id: request.conflict_id,
                        applied: true,
                        error: None,
                    },
                    Err(e) => {
                        warn!(conflict_id = request.conflict_id, error = %e, "resolution skipped");
                        ResolutionOutcome {
                            conflict_id: request.conflict_id,
                            applied: false,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .collect()
    }
}
