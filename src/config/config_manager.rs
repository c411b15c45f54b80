// ==========================================
// Patient Registry - configuration manager
// ==========================================
// Storage: config_kv (scope_id + key -> value)
// Only the 'global' scope is used; missing keys fall back to defaults.
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::KindSelector;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Share an existing connection; the shared PRAGMAs are re-applied (idempotent).
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Read a global key
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Upsert a global key
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// Every global key currently stored
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    // ===== query limits =====

    pub fn get_patient_list_limit(&self) -> RepositoryResult<usize> {
        let value = self.get_config_or_default(config_keys::PATIENT_LIST_LIMIT, "100")?;
        Ok(value.trim().parse::<usize>().unwrap_or(100))
    }

    pub fn get_pending_conflict_limit(&self) -> RepositoryResult<usize> {
        let value = self.get_config_or_default(config_keys::PENDING_CONFLICT_LIMIT, "50")?;
        Ok(value.trim().parse::<usize>().unwrap_or(50))
    }
}

impl ImportConfigReader for ConfigManager {
    fn get_unique_id_prefix(&self) -> RepositoryResult<String> {
        self.get_config_or_default(config_keys::UNIQUE_ID_PREFIX, "PSB_Un")
    }

    fn get_default_record_kind(&self) -> RepositoryResult<KindSelector> {
        let value = self.get_config_or_default(config_keys::DEFAULT_RECORD_KIND, "auto")?;
        match value.trim().parse::<KindSelector>() {
            Ok(selector) => Ok(selector),
            Err(raw) => {
                warn!(config_key = config_keys::DEFAULT_RECORD_KIND, value = %raw, "invalid record kind, using auto");
                Ok(KindSelector::Auto)
            }
        }
    }

    fn get_create_conflicts(&self) -> RepositoryResult<bool> {
        let value = self.get_config_or_default(config_keys::CREATE_CONFLICTS, "true")?;
        match value.trim().to_lowercase().as_str() {
            "false" | "0" | "no" => Ok(false),
            _ => Ok(true),
        }
    }

    fn get_default_operator(&self) -> RepositoryResult<String> {
        self.get_config_or_default(config_keys::DEFAULT_OPERATOR, "system")
    }
}

// ==========================================
// Configuration keys
// ==========================================
pub mod config_keys {
    // import
    pub const UNIQUE_ID_PREFIX: &str = "import.unique_id_prefix";
    pub const DEFAULT_RECORD_KIND: &str = "import.default_record_kind";
    pub const CREATE_CONFLICTS: &str = "import.create_conflicts";
    pub const DEFAULT_OPERATOR: &str = "import.default_operator";

    // queries
    pub const PATIENT_LIST_LIMIT: &str = "query.patient_list_limit";
    pub const PENDING_CONFLICT_LIMIT: &str = "query.pending_conflict_limit";
}
