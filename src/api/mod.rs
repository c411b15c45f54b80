// ==========================================
// Patient Registry - API layer
// ==========================================
// Entry points used by the CLI; business logic stays in importer/.
// ==========================================

pub mod error;
pub mod import_api;
pub mod patient_api;

pub use error::{ApiError, ApiResult};
pub use import_api::{BatchResolveResponse, ImportApi, PatientConflictGroup};
pub use patient_api::{CreatePatientOutcome, DashboardStats, PatientApi, PatientDetail};
