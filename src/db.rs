// ==========================================
// Patient Registry - SQLite connection setup
// ==========================================
// Goals:
// - every Connection::open goes through the same PRAGMAs, so cascade
//   deletes from patient -> data_conflict always fire
// - uniform busy_timeout to absorb occasional lock contention
// ==========================================

use crate::domain::patient::PatientField;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// Default busy_timeout (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// schema_version expected by this build
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Apply the shared PRAGMAs to a connection.
///
/// foreign_keys and busy_timeout are per-connection settings in SQLite.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a SQLite connection with the shared configuration applied
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Read schema_version (None when the table does not exist yet)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// Create every table the registry needs (idempotent).
///
/// The patient attribute columns are generated from `PatientField::ALL`, so
/// the table always carries exactly the canonical field set.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    let attribute_columns: String = PatientField::ALL
        .iter()
        .map(|field| format!("    {} TEXT,\n", field.name()))
        .collect();

    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS patient (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            id_unico TEXT UNIQUE,
            nome_paciente TEXT NOT NULL,
            data_nascimento TEXT NOT NULL,
            nome_mae TEXT NOT NULL,
{attribute_columns}            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_patient_identity
            ON patient (nome_paciente, data_nascimento, nome_mae);
        CREATE INDEX IF NOT EXISTS idx_patient_birth_date
            ON patient (data_nascimento);

        CREATE TABLE IF NOT EXISTS data_conflict (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL REFERENCES patient(id) ON DELETE CASCADE,
            field_name TEXT NOT NULL,
            existing_value TEXT NOT NULL,
            new_value TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            chosen_value TEXT,
            resolved_by TEXT,
            detected_at TEXT NOT NULL,
            resolved_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_conflict_status ON data_conflict (status);
        CREATE INDEX IF NOT EXISTS idx_conflict_patient ON data_conflict (patient_id);

        CREATE TABLE IF NOT EXISTS import_batch (
            batch_id TEXT PRIMARY KEY,
            file_name TEXT,
            record_kind TEXT NOT NULL,
            create_conflicts INTEGER NOT NULL,
            total_rows INTEGER NOT NULL,
            new_rows INTEGER NOT NULL,
            updated_rows INTEGER NOT NULL,
            conflicted_rows INTEGER NOT NULL,
            errored_rows INTEGER NOT NULL,
            conflict_count INTEGER NOT NULL,
            imported_by TEXT,
            imported_at TEXT NOT NULL,
            elapsed_ms INTEGER
        );

        INSERT OR IGNORE INTO schema_version (version) VALUES ({version});
        "#,
        attribute_columns = attribute_columns,
        version = CURRENT_SCHEMA_VERSION,
    );

    conn.execute_batch(&ddl)
}
