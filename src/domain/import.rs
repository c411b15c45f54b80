// ==========================================
// Patient Registry - import results
// ==========================================
// RowOutcome is the per-row result of the merge engine; ImportReport
// aggregates a whole sheet; ImportBatch is its stored bookkeeping row.
// ==========================================

use crate::domain::conflict::DataConflict;
use crate::domain::patient::{PatientField, PatientRecord};
use crate::domain::types::RecordKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// RejectKind - why a row was not applied
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    MissingIdentity, // name / birth date / mother missing, nothing written
    ProcessingError, // store or processing failure, row rolled back
}

// ==========================================
// RowOutcome - result of processing one candidate
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    /// No duplicate found; stored as a new record
    New { record: PatientRecord },
    /// Duplicate found and merged without conflicts (list may be empty)
    Updated {
        record: PatientRecord,
        updated_fields: Vec<PatientField>,
    },
    /// Duplicate found; at least one conflict recorded
    Conflicted {
        record: PatientRecord,
        updated_fields: Vec<PatientField>,
        conflicts: Vec<DataConflict>,
    },
    /// Row not applied
    Rejected { kind: RejectKind, message: String },
}

impl RowOutcome {
    pub fn status(&self) -> RowStatus {
        match self {
            RowOutcome::New { .. } => RowStatus::New,
            RowOutcome::Updated { .. } => RowStatus::Updated,
            RowOutcome::Conflicted { .. } => RowStatus::Conflicted,
            RowOutcome::Rejected { .. } => RowStatus::Error,
        }
    }

    pub fn record(&self) -> Option<&PatientRecord> {
        match self {
            RowOutcome::New { record }
            | RowOutcome::Updated { record, .. }
            | RowOutcome::Conflicted { record, .. } => Some(record),
            RowOutcome::Rejected { .. } => None,
        }
    }
}

// ==========================================
// RowStatus - flat status used in reports
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    New,
    Updated,
    Conflicted,
    Error,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RowStatus::New => "new",
            RowStatus::Updated => "updated",
            RowStatus::Conflicted => "conflicted",
            RowStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

// ==========================================
// RowDetail - per-row line of the report
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDetail {
    pub row: usize,                          // physical sheet row (header is row 1)
    pub status: RowStatus,
    pub patient_id: Option<i64>,
    pub id_unico: Option<String>,
    pub nome_paciente: Option<String>,
    pub updated_fields: Vec<PatientField>,
    pub conflict_count: usize,
    pub reject_kind: Option<RejectKind>,
    pub message: Option<String>,
}

impl RowDetail {
    pub fn from_outcome(row: usize, outcome: &RowOutcome) -> Self {
        let record = outcome.record();
        let (updated_fields, conflict_count, reject_kind, message) = match outcome {
            RowOutcome::New { .. } => (Vec::new(), 0, None, None),
            RowOutcome::Updated { updated_fields, .. } => (updated_fields.clone(), 0, None, None),
            RowOutcome::Conflicted {
                updated_fields,
                conflicts,
                ..
            } => (updated_fields.clone(), conflicts.len(), None, None),
            RowOutcome::Rejected { kind, message } => {
                (Vec::new(), 0, Some(*kind), Some(message.clone()))
            }
        };

        Self {
            row,
            status: outcome.status(),
            patient_id: record.map(|r| r.id),
            id_unico: record.map(|r| r.id_unico.clone()),
            nome_paciente: record.map(|r| r.nome_paciente.clone()),
            updated_fields,
            conflict_count,
            reject_kind,
            message,
        }
    }
}

// ==========================================
// ImportReport - aggregate result of one sheet
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub record_kind: RecordKind,      // kind used for mapping
    pub total: usize,                 // rows processed
    pub new: usize,
    pub updated: usize,
    pub conflicted: usize,
    pub errored: usize,
    pub details: Vec<RowDetail>,      // one per row, sheet order
    pub conflicts: Vec<DataConflict>, // every conflict created, in order
}

impl ImportReport {
    pub fn new(record_kind: RecordKind) -> Self {
        Self {
            record_kind,
            total: 0,
            new: 0,
            updated: 0,
            conflicted: 0,
            errored: 0,
            details: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Tally one row outcome
    pub fn record_row(&mut self, row: usize, outcome: RowOutcome) {
        self.total += 1;
        self.details.push(RowDetail::from_outcome(row, &outcome));
        match outcome {
            RowOutcome::New { .. } => self.new += 1,
            RowOutcome::Updated { .. } => self.updated += 1,
            RowOutcome::Conflicted { conflicts, .. } => {
                self.conflicted += 1;
                self.conflicts.extend(conflicts);
            }
            RowOutcome::Rejected { .. } => self.errored += 1,
        }
    }
}

// ==========================================
// ImportBatch - stored bookkeeping for one import
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,                 // UUID v4
    pub file_name: Option<String>,        // source file name
    pub record_kind: RecordKind,
    pub create_conflicts: bool,
    pub total_rows: i64,
    pub new_rows: i64,
    pub updated_rows: i64,
    pub conflicted_rows: i64,
    pub errored_rows: i64,
    pub conflict_count: i64,
    pub imported_by: Option<String>,
    pub imported_at: DateTime<Utc>,
    pub elapsed_ms: Option<i64>,
}

impl ImportBatch {
    pub fn from_report(
        batch_id: String,
        file_name: Option<String>,
        report: &ImportReport,
        create_conflicts: bool,
        imported_by: Option<String>,
        elapsed_ms: Option<i64>,
    ) -> Self {
        Self {
            batch_id,
            file_name,
            record_kind: report.record_kind,
            create_conflicts,
            total_rows: report.total as i64,
            new_rows: report.new as i64,
            updated_rows: report.updated as i64,
            conflicted_rows: report.conflicted as i64,
            errored_rows: report.errored as i64,
            conflict_count: report.conflicts.len() as i64,
            imported_by,
            imported_at: Utc::now(),
            elapsed_ms,
        }
    }
}

// ==========================================
// ImportSummary - what ImportApi returns
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch: ImportBatch,
    pub report: ImportReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_row_is_tallied_as_error() {
        let mut report = ImportReport::new(RecordKind::Samples);
        report.record_row(
            2,
            RowOutcome::Rejected {
                kind: RejectKind::MissingIdentity,
                message: "missing identity fields: nome_mae".to_string(),
            },
        );

        assert_eq!(report.total, 1);
        assert_eq!(report.errored, 1);
        assert_eq!(report.details[0].row, 2);
        assert_eq!(report.details[0].status, RowStatus::Error);
        assert_eq!(
            report.details[0].reject_kind,
            Some(RejectKind::MissingIdentity)
        );
        assert!(report.details[0].patient_id.is_none());
    }
}
