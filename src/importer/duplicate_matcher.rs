// ==========================================
// Patient Registry - duplicate matcher
// ==========================================
// Primary key: patient name (case-insensitive) + birth date.
// Mother's name only narrows an ambiguous primary match.
// ==========================================

use crate::domain::patient::PatientRecord;
use crate::repository::error::RepositoryResult;
use crate::repository::patient_store::PatientStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a duplicate was picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResolution {
    /// Exactly one record shares name and birth date
    Exact,
    /// Several did; the mother's name singled one out
    NarrowedByMother,
    /// Several did and the mother's name matched none of them;
    /// the lowest storage id was taken
    AmbiguousFallback { candidates: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMatch {
    pub record: PatientRecord,
    pub resolution: MatchResolution,
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Find the stored record a candidate duplicates, if any.
///
/// # Returns
/// - Ok(None): no record with that name and birth date
/// - Ok(Some(m)): the match and how it was resolved
pub fn find_duplicate(
    store: &dyn PatientStore,
    nome_paciente: &str,
    data_nascimento: NaiveDate,
    nome_mae: &str,
) -> RepositoryResult<Option<DuplicateMatch>> {
    // ordered by storage id
    let mut primary: Vec<PatientRecord> = store
        .find_by_birth_date(data_nascimento)?
        .into_iter()
        .filter(|p| same_text(&p.nome_paciente, nome_paciente))
        .collect();

    let found = match primary.len() {
        0 => None,
        1 => Some(DuplicateMatch {
            record: primary.remove(0),
            resolution: MatchResolution::Exact,
        }),
        candidates => {
            let narrowed = primary
                .iter()
                .position(|p| same_text(&p.nome_mae, nome_mae));
            match narrowed {
                Some(idx) => Some(DuplicateMatch {
                    record: primary.swap_remove(idx),
                    resolution: MatchResolution::NarrowedByMother,
                }),
                None => {
                    let record = primary.remove(0);
                    warn!(
                        candidates = candidates,
                        patient_id = record.id,
                        birth_date = %data_nascimento,
                        "ambiguous duplicate, mother's name matched none; using lowest id"
                    );
                    Some(DuplicateMatch {
                        record,
                        resolution: MatchResolution::AmbiguousFallback { candidates },
                    })
                }
            }
        }
    };

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::patient::{NewPatient, PatientAttributes, PatientIdentity};
    use crate::repository::patient_repo::PatientRepository;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn repo() -> PatientRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        PatientRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn birth() -> NaiveDate {
        NaiveDate::from_ymd_opt(1990, 3, 15).unwrap()
    }

    fn insert(repo: &PatientRepository, name: &str, mother: &str) -> PatientRecord {
        repo.insert_patient(
            &NewPatient {
                identity: PatientIdentity {
                    nome_paciente: name.to_string(),
                    data_nascimento: birth(),
                    nome_mae: mother.to_string(),
                },
                attributes: PatientAttributes::default(),
            },
            "PSB_Un",
        )
        .unwrap()
    }

    #[test]
    fn test_no_match() {
        let repo = repo();
        insert(&repo, "Ana", "Maria");
        let found = find_duplicate(&repo, "Bia", birth(), "Maria").unwrap();
        assert!(found.is_none());

        let other_day = NaiveDate::from_ymd_opt(1990, 3, 16).unwrap();
        assert!(find_duplicate(&repo, "Ana", other_day, "Maria").unwrap().is_none());
    }

    #[test]
    fn test_exact_match_ignores_case_and_mother() {
        let repo = repo();
        let stored = insert(&repo, "Ana Souza", "Maria");
        let found = find_duplicate(&repo, "ANA SOUZA", birth(), "someone else")
            .unwrap()
            .unwrap();
        assert_eq!(found.record.id, stored.id);
        assert_eq!(found.resolution, MatchResolution::Exact);
    }

    #[test]
    fn test_unicode_case_folding() {
        let repo = repo();
        let stored = insert(&repo, "João Conceição", "Márcia");
        let found = find_duplicate(&repo, "JOÃO CONCEIÇÃO", birth(), "márcia")
            .unwrap()
            .unwrap();
        assert_eq!(found.record.id, stored.id);
    }

    #[test]
    fn test_narrow_by_mother() {
        let repo = repo();
        insert(&repo, "Ana", "Maria");
        let second = insert(&repo, "Ana", "Joana");
        let found = find_duplicate(&repo, "ana", birth(), "JOANA").unwrap().unwrap();
        assert_eq!(found.record.id, second.id);
        assert_eq!(found.resolution, MatchResolution::NarrowedByMother);
    }

    #[test]
    fn test_ambiguous_fallback_takes_lowest_id() {
        let repo = repo();
        let first = insert(&repo, "Ana", "Maria");
        insert(&repo, "Ana", "Joana");
        let found = find_duplicate(&repo, "Ana", birth(), "Clara").unwrap().unwrap();
        assert_eq!(found.record.id, first.id);
        assert_eq!(
            found.resolution,
            MatchResolution::AmbiguousFallback { candidates: 2 }
        );
    }
}
