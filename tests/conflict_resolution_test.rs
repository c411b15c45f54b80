// ==========================================
// Conflict resolution integration tests
// ==========================================
// pending -> resolved / ignored, exactly once
// ==========================================


use patient_registry::domain::{
    ConflictStatus, DataConflict, KindSelector, PatientField, RecordKind, ResolutionChoice,
};
use patient_registry::domain::ResolutionRequest;
use patient_registry::importer::{ConflictResolver, PatientImporter, ResolutionError};
use patient_registry::repository::PatientStore;
use test_helpers::{create_test_db, open_repos, text_sheet, TestRepos, CLINICAL_HEADER};

/// Import CARS/QI twice with different values; returns the created conflicts
fn seed_conflicts(repos: &TestRepos) -> Vec<DataConflict> {
    let importer = PatientImporter::new(
        repos.patients.clone(),
        repos.batches.clone(),
        repos.config.clone(),
    );
    let first = text_sheet(
        CLINICAL_HEADER,
        &[&["Ana Souza", "15/03/1990", "Maria", "P1", "10", "90", ""]],
    );
    let second = text_sheet(
        CLINICAL_HEADER,
        &[&["Ana Souza", "15/03/1990", "Maria", "P1", "20", "95", ""]],
    );
    importer
        .import_sheet(&first, KindSelector::Explicit(RecordKind::Clinical), true)
        .unwrap();
    let report = importer
        .import_sheet(&second, KindSelector::Explicit(RecordKind::Clinical), true)
        .unwrap();
    assert_eq!(report.conflicts.len(), 2);
    report.conflicts
}

fn cars_conflict(conflicts: &[DataConflict]) -> &DataConflict {
    conflicts
        .iter()
        .find(|c| c.field == PatientField::Cars)
        .unwrap()
}

#[test]
fn test_keep_existing_leaves_record_untouched() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let conflicts = seed_conflicts(&repos);
    let cars = cars_conflict(&conflicts);
    let resolver = ConflictResolver::new(repos.patients.clone());

    let resolved = resolver
        .apply_resolution(cars.id, ResolutionChoice::Existing, "revisora")
        .unwrap();

    assert_eq!(resolved.status, ConflictStatus::Resolved);
    assert_eq!(resolved.chosen_value.as_deref(), Some("10"));
    assert_eq!(resolved.resolved_by.as_deref(), Some("revisora"));
    assert!(resolved.resolved_at.is_some());

    let patient = repos.patients.get_patient(cars.patient_id).unwrap().unwrap();
    assert_eq!(patient.attributes.cars.as_deref(), Some("10"));
}

#[test]
fn test_adopt_new_writes_incoming_value() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let conflicts = seed_conflicts(&repos);
    let cars = cars_conflict(&conflicts);
    let resolver = ConflictResolver::new(repos.patients.clone());

    let resolved = resolver
        .apply_resolution(cars.id, ResolutionChoice::New, "revisora")
        .unwrap();

    assert_eq!(resolved.chosen_value.as_deref(), Some("20"));
    let patient = repos.patients.get_patient(cars.patient_id).unwrap().unwrap();
    assert_eq!(patient.attributes.cars.as_deref(), Some("20"));
    // the other field is still in dispute and untouched
    assert_eq!(patient.attributes.qi.as_deref(), Some("90"));
    assert_eq!(repos.patients.count_pending_conflicts().unwrap(), 1);
}

#[test]
fn test_second_resolution_is_rejected() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let conflicts = seed_conflicts(&repos);
    let cars = cars_conflict(&conflicts);
    let resolver = ConflictResolver::new(repos.patients.clone());

    resolver
        .apply_resolution(cars.id, ResolutionChoice::New, "primeira")
        .unwrap();
    let second = resolver.apply_resolution(cars.id, ResolutionChoice::Existing, "segunda");

    assert!(matches!(
        second,
        Err(ResolutionError::NotPending {
            status: ConflictStatus::Resolved,
            ..
        })
    ));

    let stored = repos.patients.get_conflict(cars.id).unwrap().unwrap();
    assert_eq!(stored.chosen_value.as_deref(), Some("20"));
    assert_eq!(stored.resolved_by.as_deref(), Some("primeira"));
    let patient = repos.patients.get_patient(cars.patient_id).unwrap().unwrap();
    assert_eq!(patient.attributes.cars.as_deref(), Some("20"));
}

#[test]
fn test_ignore_is_terminal() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let conflicts = seed_conflicts(&repos);
    let cars = cars_conflict(&conflicts);
    let resolver = ConflictResolver::new(repos.patients.clone());

    let ignored = resolver.ignore_conflict(cars.id, "revisora").unwrap();
    assert_eq!(ignored.status, ConflictStatus::Ignored);
    assert_eq!(ignored.chosen_value, None);

    let again = resolver.apply_resolution(cars.id, ResolutionChoice::New, "revisora");
    assert!(matches!(
        again,
        Err(ResolutionError::NotPending {
            status: ConflictStatus::Ignored,
            requested: ConflictStatus::Resolved,
            ..
        })
    ));
    let patient = repos.patients.get_patient(cars.patient_id).unwrap().unwrap();
    assert_eq!(patient.attributes.cars.as_deref(), Some("10"));
}

#[test]
fn test_ignore_after_resolution_reports_requested_status() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let conflicts = seed_conflicts(&repos);
    let cars = cars_conflict(&conflicts);
    let resolver = ConflictResolver::new(repos.patients.clone());

    resolver
        .apply_resolution(cars.id, ResolutionChoice::New, "revisora")
        .unwrap();
    let ignored = resolver.ignore_conflict(cars.id, "revisora");

    assert!(matches!(
        ignored,
        Err(ResolutionError::NotPending {
            status: ConflictStatus::Resolved,
            requested: ConflictStatus::Ignored,
            ..
        })
    ));
    let stored = repos.patients.get_conflict(cars.id).unwrap().unwrap();
    assert_eq!(stored.status, ConflictStatus::Resolved);
}

#[test]
fn test_unknown_conflict() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let resolver = ConflictResolver::new(repos.patients.clone());

    let result = resolver.apply_resolution(4242, ResolutionChoice::Existing, "revisora");
    assert!(matches!(result, Err(ResolutionError::ConflictNotFound(4242))));
}

#[test]
fn test_batch_resolution_continues_past_failures() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let conflicts = seed_conflicts(&repos);
    let cars = cars_conflict(&conflicts).id;
    let qi = conflicts
        .iter()
        .find(|c| c.field == PatientField::Qi)
        .unwrap()
        .id;
    let resolver = ConflictResolver::new(repos.patients.clone());

    let requests = [
        ResolutionRequest { conflict_id: cars, choice: ResolutionChoice::New },
        ResolutionRequest { conflict_id: 9999, choice: ResolutionChoice::Existing },
        ResolutionRequest { conflict_id: qi, choice: ResolutionChoice::Existing },
        ResolutionRequest { conflict_id: cars, choice: ResolutionChoice::Existing },
    ];
    let outcomes = resolver.apply_resolutions(&requests, "lote");

    let applied: Vec<bool> = outcomes.iter().map(|o| o.applied).collect();
    assert_eq!(applied, vec![true, false, true, false]);
    assert!(outcomes[1].error.is_some());
    assert!(outcomes[3].error.is_some());

    let patient_id = conflicts[0].patient_id;
    let patient = repos.patients.get_patient(patient_id).unwrap().unwrap();
    assert_eq!(patient.attributes.cars.as_deref(), Some("20"));
    assert_eq!(patient.attributes.qi.as_deref(), Some("90"));
    assert_eq!(repos.patients.count_pending_conflicts().unwrap(), 0);
}
