// ==========================================
// Patient Registry - repository layer
// ==========================================
// Data access only; every query is parameterised.
// ==========================================

pub mod error;
pub mod import_batch_repo;
pub mod patient_repo;
pub mod patient_store;

pub use error::{RepositoryError, RepositoryResult};
pub use import_batch_repo::ImportBatchRepository;
pub use patient_repo::PatientRepository;
pub use patient_store::{ConflictClosure, PatientStore};
