// ==========================================
// Patient Registry - patient / conflict repository
// ==========================================
// Tables: patient, data_conflict
// Patient attribute columns come from PatientField::ALL, so every
// statement below is built from the same table.
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::conflict::{ConflictView, DataConflict, NewConflict};
use crate::domain::patient::{NewPatient, PatientAttributes, PatientField, PatientFilter, PatientRecord};
use crate::domain::types::ConflictStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::patient_store::{ConflictClosure, PatientStore};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::debug;

const CONFLICT_COLUMNS: &str = "id, patient_id, field_name, existing_value, new_value, status, \
     chosen_value, resolved_by, detected_at, resolved_at";

/// `id, id_unico, nome_paciente, data_nascimento, nome_mae, <attributes>, created_at, updated_at`
fn patient_columns() -> String {
    let attributes: Vec<&str> = PatientField::ALL.iter().map(|f| f.name()).collect();
    format!(
        "id, id_unico, nome_paciente, data_nascimento, nome_mae, {}, created_at, updated_at",
        attributes.join(", ")
    )
}

fn conversion_error(idx: usize, field: &str, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(RepositoryError::FieldValueError {
            field: field.to_string(),
            message,
        }),
    )
}

fn map_patient_row(row: &Row) -> rusqlite::Result<PatientRecord> {
    let mut attributes = PatientAttributes::default();
    let first_attribute = 5;
    for (offset, field) in PatientField::ALL.iter().enumerate() {
        let value: Option<String> = row.get(first_attribute + offset)?;
        field.set(&mut attributes, value);
    }
    let after = first_attribute + PatientField::ALL.len();

    Ok(PatientRecord {
        id: row.get(0)?,
        id_unico: row.get(1)?,
        nome_paciente: row.get(2)?,
        data_nascimento: row.get(3)?,
        nome_mae: row.get(4)?,
        attributes,
        created_at: row.get(after)?,
        updated_at: row.get(after + 1)?,
    })
}

fn map_conflict_row(row: &Row) -> rusqlite::Result<DataConflict> {
    let field_name: String = row.get(2)?;
    let field = PatientField::from_name(&field_name)
        .ok_or_else(|| conversion_error(2, "field_name", format!("unknown field {}", field_name)))?;

    let status_raw: String = row.get(5)?;
    let status = status_raw
        .parse::<ConflictStatus>()
        .map_err(|e| conversion_error(5, "status", e))?;

    Ok(DataConflict {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        field,
        existing_value: row.get(3)?,
        new_value: row.get(4)?,
        status,
        chosen_value: row.get(6)?,
        resolved_by: row.get(7)?,
        detected_at: row.get(8)?,
        resolved_at: row.get(9)?,
    })
}

// ==========================================
// PatientRepository
// ==========================================
/// Data access for patients and their conflicts.
pub struct PatientRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PatientRepository {
    /// Open the repository on a database file
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Share an existing connection
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // statement helpers (work on a Connection or a Transaction)
    // ==========================================

    fn load_patient(conn: &Connection, patient_id: i64) -> RepositoryResult<Option<PatientRecord>> {
        let sql = format!("SELECT {} FROM patient WHERE id = ?1", patient_columns());
        let record = conn
            .query_row(&sql, params![patient_id], map_patient_row)
            .optional()?;
        Ok(record)
    }

    fn load_conflict(conn: &Connection, conflict_id: i64) -> RepositoryResult<Option<DataConflict>> {
        let sql = format!("SELECT {} FROM data_conflict WHERE id = ?1", CONFLICT_COLUMNS);
        let conflict = conn
            .query_row(&sql, params![conflict_id], map_conflict_row)
            .optional()?;
        Ok(conflict)
    }

    /// Rewrite every attribute column of `record` and stamp updated_at
    fn write_attributes(
        conn: &Connection,
        record: &PatientRecord,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let assignments: Vec<String> = PatientField::ALL
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ?{}", f.name(), i + 1))
            .collect();
        let n = PatientField::ALL.len();
        let sql = format!(
            "UPDATE patient SET {}, updated_at = ?{} WHERE id = ?{}",
            assignments.join(", "),
            n + 1,
            n + 2
        );

        let mut values: Vec<Box<dyn ToSql>> = PatientField::ALL
            .iter()
            .map(|f| Box::new(f.get(&record.attributes)) as Box<dyn ToSql>)
            .collect();
        values.push(Box::new(now));
        values.push(Box::new(record.id));

        let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "patient".to_string(),
                id: record.id.to_string(),
            });
        }
        Ok(())
    }

    fn insert_conflict(
        conn: &Connection,
        patient_id: i64,
        conflict: &NewConflict,
        now: DateTime<Utc>,
    ) -> RepositoryResult<DataConflict> {
        conn.execute(
            r#"
            INSERT INTO data_conflict (
                patient_id, field_name, existing_value, new_value, status, detected_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                patient_id,
                conflict.field.name(),
                conflict.existing_value,
                conflict.new_value,
                ConflictStatus::Pending.as_str(),
                now,
            ],
        )?;

        Ok(DataConflict {
            id: conn.last_insert_rowid(),
            patient_id,
            field: conflict.field,
            existing_value: conflict.existing_value.clone(),
            new_value: conflict.new_value.clone(),
            status: ConflictStatus::Pending,
            chosen_value: None,
            resolved_by: None,
            detected_at: now,
            resolved_at: None,
        })
    }

    // ==========================================
    // queries used by the API layer
    // ==========================================

    /// Search patients, newest first.
    ///
    /// Text criteria are case-insensitive substring matches (Unicode
    /// lowercase), applied after the SQL birth-date filter.
    pub fn search_patients(
        &self,
        filter: &PatientFilter,
        limit: usize,
    ) -> RepositoryResult<Vec<PatientRecord>> {
        let conn = self.get_conn()?;
        let base = format!("SELECT {} FROM patient", patient_columns());

        let rows: Vec<PatientRecord> = match filter.birth_date {
            Some(date) => {
                let sql = format!(
                    "{} WHERE data_nascimento = ?1 ORDER BY created_at DESC, id DESC",
                    base
                );
                let mut stmt = conn.prepare(&sql)?;
                let mapped = stmt.query_map(params![date], map_patient_row)?;
                mapped.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("{} ORDER BY created_at DESC, id DESC", base);
                let mut stmt = conn.prepare(&sql)?;
                let mapped = stmt.query_map([], map_patient_row)?;
                mapped.collect::<Result<Vec<_>, _>>()?
            }
        };

        let contains = |haystack: Option<&str>, needle: &Option<String>| match needle {
            None => true,
            Some(n) if n.trim().is_empty() => true,
            Some(n) => haystack
                .map(|h| h.to_lowercase().contains(&n.trim().to_lowercase()))
                .unwrap_or(false),
        };

        let result: Vec<PatientRecord> = rows
            .into_iter()
            .filter(|p| contains(Some(p.nome_paciente.as_str()), &filter.name_contains))
            .filter(|p| contains(Some(p.nome_mae.as_str()), &filter.mother_contains))
            .filter(|p| contains(p.attributes.id_projeto.as_deref(), &filter.project_contains))
            .take(limit)
            .collect();

        debug!(found = result.len(), limit = limit, "patient search finished");
        Ok(result)
    }

    /// Most recently created patients
    pub fn recent_patients(&self, limit: usize) -> RepositoryResult<Vec<PatientRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM patient ORDER BY created_at DESC, id DESC LIMIT ?1",
            patient_columns()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit as i64], map_patient_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_patients(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM patient", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Distinct non-empty project ids
    pub fn list_projects(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT id_projeto FROM patient \
             WHERE id_projeto IS NOT NULL AND id_projeto <> '' ORDER BY id_projeto",
        )?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete a patient; its conflicts go with it (ON DELETE CASCADE).
    ///
    /// # Returns
    /// - Ok(false) when no such patient exists
    pub fn delete_patient(&self, patient_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute("DELETE FROM patient WHERE id = ?1", params![patient_id])?;
        Ok(changed > 0)
    }

    /// Replace every attribute of a stored patient; identity columns stay as they are.
    ///
    /// # Returns
    /// - Ok(None) when no such patient exists
    pub fn update_attributes(
        &self,
        patient_id: i64,
        attributes: &PatientAttributes,
    ) -> RepositoryResult<Option<PatientRecord>> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut record = match Self::load_patient(&tx, patient_id)? {
            Some(record) => record,
            None => return Ok(None),
        };
        let now = Utc::now();
        record.attributes = attributes.clone();
        Self::write_attributes(&tx, &record, now)?;
        record.updated_at = now;

        tx.commit()?;
        Ok(Some(record))
    }

    pub fn count_pending_conflicts(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM data_conflict WHERE status = ?1",
            params![ConflictStatus::Pending.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Pending conflicts joined with their patient, newest first
    pub fn list_pending_conflicts(
        &self,
        patient_id: Option<i64>,
        limit: usize,
    ) -> RepositoryResult<Vec<ConflictView>> {
        let conn = self.get_conn()?;
        let columns: Vec<String> = CONFLICT_COLUMNS
            .split(", ")
            .map(|c| format!("c.{}", c.trim()))
            .collect();
        let sql = format!(
            r#"
            SELECT {}, p.id_unico, p.nome_paciente
            FROM data_conflict c
            JOIN patient p ON p.id = c.patient_id
            WHERE c.status = ?1 AND (?2 IS NULL OR c.patient_id = ?2)
            ORDER BY c.detected_at DESC, c.id DESC
            LIMIT ?3
            "#,
            columns.join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![ConflictStatus::Pending.as_str(), patient_id, limit as i64],
                |row| {
                    Ok(ConflictView {
                        conflict: map_conflict_row(row)?,
                        id_unico: row.get(10)?,
                        nome_paciente: row.get(11)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Every conflict (any status) of one patient, oldest first
    pub fn list_conflicts_for_patient(&self, patient_id: i64) -> RepositoryResult<Vec<DataConflict>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM data_conflict WHERE patient_id = ?1 ORDER BY id",
            CONFLICT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![patient_id], map_conflict_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// ==========================================
// PatientStore implementation
// ==========================================
impl PatientStore for PatientRepository {
    fn find_by_birth_date(&self, birth_date: NaiveDate) -> RepositoryResult<Vec<PatientRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM patient WHERE data_nascimento = ?1 ORDER BY id",
            patient_columns()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![birth_date], map_patient_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_patient(&self, patient_id: i64) -> RepositoryResult<Option<PatientRecord>> {
        let conn = self.get_conn()?;
        Self::load_patient(&conn, patient_id)
    }

    fn insert_patient(
        &self,
        patient: &NewPatient,
        unique_id_prefix: &str,
    ) -> RepositoryResult<PatientRecord> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();

        let attribute_names: Vec<&str> = PatientField::ALL.iter().map(|f| f.name()).collect();
        let placeholders: Vec<String> = (1..=attribute_names.len() + 5)
            .map(|i| format!("?{}", i))
            .collect();
        let sql = format!(
            "INSERT INTO patient (nome_paciente, data_nascimento, nome_mae, {}, created_at, updated_at) \
             VALUES ({})",
            attribute_names.join(", "),
            placeholders.join(", ")
        );

        let identity = &patient.identity;
        let mut values: Vec<Box<dyn ToSql>> = vec![
            Box::new(identity.nome_paciente.clone()),
            Box::new(identity.data_nascimento),
            Box::new(identity.nome_mae.clone()),
        ];
        for field in PatientField::ALL {
            values.push(Box::new(field.get(&patient.attributes)));
        }
        values.push(Box::new(now));
        values.push(Box::new(now));

        tx.execute(&sql, params_from_iter(values.iter()))?;
        let id = tx.last_insert_rowid();

        let id_unico = format!("{}{}", unique_id_prefix, id);
        tx.execute(
            "UPDATE patient SET id_unico = ?1 WHERE id = ?2",
            params![id_unico, id],
        )?;

        let record = Self::load_patient(&tx, id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "patient".to_string(),
            id: id.to_string(),
        })?;
        tx.commit()?;

        debug!(patient_id = id, id_unico = %record.id_unico, "patient inserted");
        Ok(record)
    }

    fn commit_merge(
        &self,
        record: &PatientRecord,
        write_record: bool,
        conflicts: &[NewConflict],
    ) -> RepositoryResult<(PatientRecord, Vec<DataConflict>)> {
        if !write_record && conflicts.is_empty() {
            return Ok((record.clone(), Vec::new()));
        }

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();

        let mut stored_record = record.clone();
        if write_record {
            Self::write_attributes(&tx, record, now)?;
            stored_record.updated_at = now;
        }

        let mut stored_conflicts = Vec::with_capacity(conflicts.len());
        for conflict in conflicts {
            stored_conflicts.push(Self::insert_conflict(&tx, record.id, conflict, now)?);
        }

        tx.commit()?;
        Ok((stored_record, stored_conflicts))
    }

    fn get_conflict(&self, conflict_id: i64) -> RepositoryResult<Option<DataConflict>> {
        let conn = self.get_conn()?;
        Self::load_conflict(&conn, conflict_id)
    }

    fn close_conflict(
        &self,
        conflict_id: i64,
        closure: &ConflictClosure,
        record_update: Option<&PatientRecord>,
    ) -> RepositoryResult<Option<DataConflict>> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();

        let changed = tx.execute(
            r#"
            UPDATE data_conflict
            SET status = ?1, chosen_value = ?2, resolved_by = ?3, resolved_at = ?4
            WHERE id = ?5 AND status = ?6
            "#,
            params![
                closure.status.as_str(),
                closure.chosen_value,
                closure.resolved_by,
                now,
                conflict_id,
                ConflictStatus::Pending.as_str(),
            ],
        )?;
        if changed == 0 {
            // dropped without commit: rolled back
            return Ok(None);
        }

        if let Some(record) = record_update {
            Self::write_attributes(&tx, record, now)?;
        }

        let conflict = Self::load_conflict(&tx, conflict_id)?;
        tx.commit()?;
        Ok(conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::patient::PatientIdentity;

    fn repo() -> PatientRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        PatientRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn new_patient(name: &str, mother: &str) -> NewPatient {
        NewPatient {
            identity: PatientIdentity {
                nome_paciente: name.to_string(),
                data_nascimento: NaiveDate::from_ymd_opt(1990, 3, 15).unwrap(),
                nome_mae: mother.to_string(),
            },
            attributes: PatientAttributes {
                cars: Some("10".to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_insert_assigns_unique_id_from_sequence() {
        let repo = repo();
        let first = repo.insert_patient(&new_patient("Ana", "Maria"), "PSB_Un").unwrap();
        let second = repo.insert_patient(&new_patient("Bia", "Joana"), "PSB_Un").unwrap();

        assert_eq!(first.id_unico, format!("PSB_Un{}", first.id));
        assert_eq!(second.id_unico, format!("PSB_Un{}", second.id));
        assert_ne!(first.id_unico, second.id_unico);
        assert_eq!(first.attributes.cars.as_deref(), Some("10"));
    }

    #[test]
    fn test_update_attributes_replaces_all_attributes() {
        let repo = repo();
        let created = repo.insert_patient(&new_patient("Ana", "Maria"), "PSB_Un").unwrap();

        let attributes = PatientAttributes {
            qi: Some("95".to_string()),
            ..Default::default()
        };
        let updated = repo.update_attributes(created.id, &attributes).unwrap().unwrap();
        assert_eq!(updated.attributes, attributes);
        assert_eq!(updated.nome_paciente, "Ana");
        assert!(updated.updated_at >= created.updated_at);

        let stored = repo.get_patient(created.id).unwrap().unwrap();
        assert_eq!(stored.attributes.cars, None);
        assert_eq!(stored.attributes.qi.as_deref(), Some("95"));
        assert_eq!(stored.id_unico, created.id_unico);

        assert!(repo.update_attributes(9999, &attributes).unwrap().is_none());
    }

    #[test]
    fn test_commit_merge_writes_record_and_conflicts() {
        let repo = repo();
        let mut record = repo.insert_patient(&new_patient("Ana", "Maria"), "PSB_Un").unwrap();
        record.attributes.sexo = Some("F".to_string());

        let (_, conflicts) = repo
            .commit_merge(
                &record,
                true,
                &[NewConflict {
                    field: PatientField::Cars,
                    existing_value: "10".to_string(),
                    new_value: "20".to_string(),
                }],
            )
            .unwrap();

        assert_eq!(conflicts.len(), 1);
        let stored = repo.get_patient(record.id).unwrap().unwrap();
        assert_eq!(stored.attributes.sexo.as_deref(), Some("F"));
        assert_eq!(repo.count_pending_conflicts().unwrap(), 1);
        assert_eq!(repo.list_conflicts_for_patient(record.id).unwrap().len(), 1);
    }

    #[test]
    fn test_close_conflict_only_once() {
        let repo = repo();
        let record = repo.insert_patient(&new_patient("Ana", "Maria"), "PSB_Un").unwrap();
        let (_, conflicts) = repo
            .commit_merge(
                &record,
                false,
                &[NewConflict {
                    field: PatientField::Cars,
                    existing_value: "10".to_string(),
                    new_value: "20".to_string(),
                }],
            )
            .unwrap();
        let closure = ConflictClosure {
            status: ConflictStatus::Ignored,
            chosen_value: None,
            resolved_by: "tester".to_string(),
        };

        let closed = repo.close_conflict(conflicts[0].id, &closure, None).unwrap();
        assert_eq!(closed.unwrap().status, ConflictStatus::Ignored);
        assert!(repo.close_conflict(conflicts[0].id, &closure, None).unwrap().is_none());
    }

    #[test]
    fn test_delete_cascades_to_conflicts() {
        let repo = repo();
        let record = repo.insert_patient(&new_patient("Ana", "Maria"), "PSB_Un").unwrap();
        repo.commit_merge(
            &record,
            false,
            &[NewConflict {
                field: PatientField::Qi,
                existing_value: "90".to_string(),
                new_value: "95".to_string(),
            }],
        )
        .unwrap();

        assert!(repo.delete_patient(record.id).unwrap());
        assert_eq!(repo.count_pending_conflicts().unwrap(), 0);
        assert!(!repo.delete_patient(record.id).unwrap());
    }

    #[test]
    fn test_search_is_unicode_case_insensitive() {
        let repo = repo();
        repo.insert_patient(&new_patient("JOÃO Silva", "Márcia"), "PSB_Un").unwrap();
        repo.insert_patient(&new_patient("Pedro", "Ana"), "PSB_Un").unwrap();

        let filter = PatientFilter {
            name_contains: Some("joão".to_string()),
            ..Default::default()
        };
        let found = repo.search_patients(&filter, 100).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nome_paciente, "JOÃO Silva");

        let by_mother = PatientFilter {
            mother_contains: Some("MÁR".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.search_patients(&by_mother, 100).unwrap().len(), 1);
    }
}
