// ==========================================
// Patient Registry - import batch repository
// ==========================================
// Table: import_batch (bookkeeping only)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::ImportBatch;
use crate::domain::types::RecordKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const BATCH_COLUMNS: &str = "batch_id, file_name, record_kind, create_conflicts, total_rows, \
     new_rows, updated_rows, conflicted_rows, errored_rows, conflict_count, imported_by, \
     imported_at, elapsed_ms";

fn parse_record_kind(raw: &str) -> Option<RecordKind> {
    RecordKind::ALL.iter().copied().find(|k| k.as_str() == raw)
}

fn map_batch_row(row: &Row) -> rusqlite::Result<ImportBatch> {
    let kind_raw: String = row.get(2)?;
    let record_kind = parse_record_kind(&kind_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            Box::new(RepositoryError::FieldValueError {
                field: "record_kind".to_string(),
                message: format!("unknown record kind {}", kind_raw),
            }),
        )
    })?;

    Ok(ImportBatch {
        batch_id: row.get(0)?,
        file_name: row.get(1)?,
        record_kind,
        create_conflicts: row.get(3)?,
        total_rows: row.get(4)?,
        new_rows: row.get(5)?,
        updated_rows: row.get(6)?,
        conflicted_rows: row.get(7)?,
        errored_rows: row.get(8)?,
        conflict_count: row.get(9)?,
        imported_by: row.get(10)?,
        imported_at: row.get(11)?,
        elapsed_ms: row.get(12)?,
    })
}

// ==========================================
// ImportBatchRepository
// ==========================================
pub struct ImportBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportBatchRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert_batch(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO import_batch ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                BATCH_COLUMNS
            ),
            params![
                batch.batch_id,
                batch.file_name,
                batch.record_kind.as_str(),
                batch.create_conflicts,
                batch.total_rows,
                batch.new_rows,
                batch.updated_rows,
                batch.conflicted_rows,
                batch.errored_rows,
                batch.conflict_count,
                batch.imported_by,
                batch.imported_at,
                batch.elapsed_ms,
            ],
        )?;
        Ok(())
    }

    pub fn get_batch(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.get_conn()?;
        let batch = conn
            .query_row(
                &format!("SELECT {} FROM import_batch WHERE batch_id = ?1", BATCH_COLUMNS),
                params![batch_id],
                map_batch_row,
            )
            .optional()?;
        Ok(batch)
    }

    /// Most recent batches first
    pub fn list_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM import_batch ORDER BY imported_at DESC LIMIT ?1",
            BATCH_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], map_batch_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
