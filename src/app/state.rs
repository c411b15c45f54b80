// ==========================================
// Patient Registry - application state
// ==========================================
// Owns the shared connection and every API instance.
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::{ApiError, ApiResult, ImportApi, PatientApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{ImportBatchRepository, PatientRepository};

/// Application state
///
/// Every repository shares one connection, so an import, a resolution
/// and a dashboard query never see each other half-way.
pub struct AppState {
    /// Database file path
    pub db_path: String,

    /// Import and conflict review API
    pub import_api: Arc<ImportApi>,

    /// Patient search / registration API
    pub patient_api: Arc<PatientApi>,

    /// Runtime settings (config_kv)
    pub config: Arc<ConfigManager>,
}

impl AppState {
    /// Open (or create) the database and wire the API layer.
    ///
    /// # Returns
    /// - Err(ApiError::DatabaseConnectionError): file could not be opened or the schema created
    pub fn new(db_path: String) -> ApiResult<Self> {
        tracing::info!(db_path = %db_path, "initialising application state");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("cannot open database: {}", e)))?;
        init_schema(&conn)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("cannot create schema: {}", e)))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // repositories
        // ==========================================
        let patient_repo = Arc::new(PatientRepository::from_connection(conn.clone()));
        let batch_repo = Arc::new(ImportBatchRepository::from_connection(conn.clone()));
        let config = Arc::new(ConfigManager::from_connection(conn)?);

        // ==========================================
        // APIs
        // ==========================================
        let import_api = Arc::new(ImportApi::new(
            patient_repo.clone(),
            batch_repo,
            config.clone(),
        ));
        let patient_api = Arc::new(PatientApi::new(patient_repo, config.clone()));

        tracing::info!("application state ready");
        Ok(Self {
            db_path,
            import_api,
            patient_api,
            config,
        })
    }
}

/// Default database location.
///
/// `PATIENT_REGISTRY_DB_PATH` wins when set; otherwise the user data
/// directory, falling back to the working directory.
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("PATIENT_REGISTRY_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./patient_registry.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("patient-registry");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("patient_registry.db");
        }
    }

    path.to_string_lossy().to_string()
}
