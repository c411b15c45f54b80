// ==========================================
// Patient Registry - data conflict model
// ==========================================
// Lifecycle: pending -> resolved | ignored
// Created only by the merge engine, mutated only by the resolver.
// ==========================================

use crate::domain::patient::PatientField;
use crate::domain::types::{ConflictStatus, ResolutionChoice};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// DataConflict - one field-level disagreement
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConflict {
    pub id: i64,                              // storage id
    pub patient_id: i64,                      // owning patient
    pub field: PatientField,                  // canonical field in dispute
    pub existing_value: String,               // stored value at detection time
    pub new_value: String,                    // incoming value
    pub status: ConflictStatus,               // pending / resolved / ignored
    pub chosen_value: Option<String>,         // value picked on resolution
    pub resolved_by: Option<String>,          // resolver identity
    pub detected_at: DateTime<Utc>,           // detection time
    pub resolved_at: Option<DateTime<Utc>>,   // set when leaving pending
}

impl DataConflict {
    pub fn is_pending(&self) -> bool {
        self.status == ConflictStatus::Pending
    }
}

// ==========================================
// NewConflict - conflict detected, not yet stored
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConflict {
    pub field: PatientField,
    pub existing_value: String,
    pub new_value: String,
}

// ==========================================
// ConflictView - conflict joined with its patient
// ==========================================
// Used by the review queue, which groups conflicts per patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictView {
    pub conflict: DataConflict,
    pub id_unico: String,
    pub nome_paciente: String,
}

// ==========================================
// ResolutionRequest - one item of a batch resolution
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    pub conflict_id: i64,
    pub choice: ResolutionChoice,
}

// ==========================================
// ResolutionOutcome - per-item result of a batch resolution
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub conflict_id: i64,
    pub applied: bool,
    pub error: Option<String>,
}
