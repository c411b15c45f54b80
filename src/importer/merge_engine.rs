// ==========================================
// Patient Registry - merge / conflict engine
// ==========================================
// Candidate vs matched record, per non-identity field in canonical order:
//   1. candidate blank          -> skip
//   2. stored blank             -> adopt (updated)
//   3. text differs             -> conflict, or overwrite when conflicts are off
//   4. equal                    -> nothing
// The merged record and its new conflicts are committed in one
// transaction; any failure rejects the row.
// ==========================================

use crate::domain::conflict::NewConflict;
use crate::domain::import::{RejectKind, RowOutcome};
use crate::domain::patient::{CandidateRecord, NewPatient, PatientAttributes, PatientField, PatientIdentity};
use crate::importer::duplicate_matcher::find_duplicate;
use crate::repository::error::RepositoryResult;
use crate::repository::patient_store::PatientStore;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

// ==========================================
// MergePlan - pure result of comparing two attribute sets
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub updated_fields: Vec<PatientField>,
    pub conflicts: Vec<NewConflict>,
}

/// Merge `incoming` into `stored` in place.
///
/// Only fields that end up in `updated_fields` are modified.
pub fn merge_attributes(
    stored: &mut PatientAttributes,
    incoming: &PatientAttributes,
    create_conflicts: bool,
) -> MergePlan {
    let mut plan = MergePlan::default();

    for field in PatientField::ALL.iter().copied() {
        let new_value = match field.get(incoming) {
            Some(v) => v,
            None => continue,
        };

        match field.get(stored) {
            None => {
                field.set(stored, Some(new_value));
                plan.updated_fields.push(field);
            }
            Some(existing) if existing != new_value => {
                if create_conflicts {
                    plan.conflicts.push(NewConflict {
                        field,
                        existing_value: existing,
                        new_value,
                    });
                } else {
                    field.set(stored, Some(new_value));
                    plan.updated_fields.push(field);
                }
            }
            Some(_) => {}
        }
    }

    plan
}

// ==========================================
// MergeEngine
// ==========================================
pub struct MergeEngine {
    store: Arc<dyn PatientStore>,
    unique_id_prefix: String,
}

impl MergeEngine {
    pub fn new(store: Arc<dyn PatientStore>, unique_id_prefix: impl Into<String>) -> Self {
        Self {
            store,
            unique_id_prefix: unique_id_prefix.into(),
        }
    }

    /// Process one candidate row.
    ///
    /// Never returns an error: failures become `RowOutcome::Rejected`.
    #[instrument(skip(self, candidate), fields(patient = ?candidate.nome_paciente))]
    pub fn process_row(&self, candidate: &CandidateRecord, create_conflicts: bool) -> RowOutcome {
        let missing = candidate.missing_identity_fields();
        let identity = match candidate.identity() {
            Some(identity) if missing.is_empty() => identity,
            _ => {
                debug!(missing = ?missing, "row rejected: identity incomplete");
                return RowOutcome::Rejected {
                    kind: RejectKind::MissingIdentity,
                    message: format!("missing identity fields: {}", missing.join(", ")),
                };
            }
        };

        match self.apply(identity, &candidate.attributes, create_conflicts) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "row rejected: processing failed");
                RowOutcome::Rejected {
                    kind: RejectKind::ProcessingError,
                    message: format!("processing error: {}", e),
                }
            }
        }
    }

    fn apply(
        &self,
        identity: PatientIdentity,
        attributes: &PatientAttributes,
        create_conflicts: bool,
    ) -> RepositoryResult<RowOutcome> {
        let duplicate = find_duplicate(
            self.store.as_ref(),
            &identity.nome_paciente,
            identity.data_nascimento,
            &identity.nome_mae,
        )?;

        let matched = match duplicate {
            None => {
                let record = self.store.insert_patient(
                    &NewPatient {
                        identity,
                        attributes: attributes.clone(),
                    },
                    &self.unique_id_prefix,
                )?;
                debug!(patient_id = record.id, id_unico = %record.id_unico, "new patient");
                return Ok(RowOutcome::New { record });
            }
            Some(m) => m,
        };

        // load -> mutate copy -> single persist
        let mut record = matched.record;
        let plan = merge_attributes(&mut record.attributes, attributes, create_conflicts);
        let write_record = !plan.updated_fields.is_empty();
        let (record, conflicts) = self.store.commit_merge(&record, write_record, &plan.conflicts)?;

        debug!(
            patient_id = record.id,
            resolution = ?matched.resolution,
            updated = plan.updated_fields.len(),
            conflicts = conflicts.len(),
            "row merged"
        );

        if conflicts.is_empty() {
            Ok(RowOutcome::Updated {
                record,
                updated_fields: plan.updated_fields,
            })
        } else {
            Ok(RowOutcome::Conflicted {
                record,
                updated_fields: plan.updated_fields,
                conflicts,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(cars: Option<&str>, sexo: Option<&str>) -> PatientAttributes {
        PatientAttributes {
            cars: cars.map(str::to_string),
            sexo: sexo.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_blank_stored_field_is_filled() {
        let mut stored = attrs(None, Some("F"));
        let plan = merge_attributes(&mut stored, &attrs(Some("10"), None), true);
        assert_eq!(plan.updated_fields, vec![PatientField::Cars]);
        assert!(plan.conflicts.is_empty());
        assert_eq!(stored.cars.as_deref(), Some("10"));
        assert_eq!(stored.sexo.as_deref(), Some("F"));
    }

    #[test]
    fn test_difference_becomes_conflict() {
        let mut stored = attrs(Some("10"), None);
        let plan = merge_attributes(&mut stored, &attrs(Some("20"), None), true);
        assert!(plan.updated_fields.is_empty());
        assert_eq!(
            plan.conflicts,
            vec![NewConflict {
                field: PatientField::Cars,
                existing_value: "10".to_string(),
                new_value: "20".to_string(),
            }]
        );
        // stored value untouched until resolution
        assert_eq!(stored.cars.as_deref(), Some("10"));
    }

    #[test]
    fn test_difference_overwrites_when_conflicts_disabled() {
        let mut stored = attrs(Some("10"), None);
        let plan = merge_attributes(&mut stored, &attrs(Some("20"), None), false);
        assert_eq!(plan.updated_fields, vec![PatientField::Cars]);
        assert!(plan.conflicts.is_empty());
        assert_eq!(stored.cars.as_deref(), Some("20"));
    }

    #[test]
    fn test_equal_values_do_nothing() {
        let mut stored = attrs(Some("10"), Some("F"));
        let plan = merge_attributes(&mut stored, &attrs(Some("10"), Some("F")), true);
        assert_eq!(plan, MergePlan::default());
    }
}
