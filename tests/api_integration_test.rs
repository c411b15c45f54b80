// ==========================================
// API integration tests
// ==========================================
// ImportApi + PatientApi through AppState, with CSV files on disk
// ==========================================


use chrono::NaiveDate;
use patient_registry::api::{ApiError, CreatePatientOutcome};
use patient_registry::config::config_keys;
use patient_registry::domain::{
    NewPatient, PatientAttributes, PatientFilter, PatientIdentity, RecordKind, ResolutionChoice,
    ResolutionRequest,
};
use patient_registry::logging;
use test_helpers::{create_test_state, write_csv, CLINICAL_HEADER, SAMPLES_HEADER};

fn new_patient(name: &str, birth: NaiveDate, mother: &str) -> NewPatient {
    NewPatient {
        identity: PatientIdentity {
            nome_paciente: name.to_string(),
            data_nascimento: birth,
            nome_mae: mother.to_string(),
        },
        attributes: PatientAttributes::default(),
    }
}

#[test]
fn test_import_file_records_batch() {
    logging::init_test();
    let (_tmp, state) = create_test_state().unwrap();
    let csv = write_csv(
        SAMPLES_HEADER,
        &[
            &["Ana Souza", "15/03/1990", "Maria", "P1", "F", "Sim", ""],
            &["Bruno Lima", "1991-07-01", "", "P1", "M", "", ""],
        ],
    )
    .unwrap();

    let summary = state
        .import_api
        .import_file(csv.path().to_str().unwrap(), None, None, Some("tester"))
        .unwrap();

    assert_eq!(summary.report.record_kind, RecordKind::Samples);
    assert_eq!(summary.report.new, 1);
    assert_eq!(summary.report.errored, 1);
    assert_eq!(summary.report.details[1].row, 3);

    let batch = state.import_api.get_batch(&summary.batch.batch_id).unwrap();
    assert_eq!(batch.total_rows, 2);
    assert_eq!(batch.new_rows, 1);
    assert_eq!(batch.errored_rows, 1);
    assert_eq!(batch.imported_by.as_deref(), Some("tester"));
    assert!(batch.create_conflicts);

    let batches = state.import_api.list_batches(10).unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].batch_id, summary.batch.batch_id);
}

#[test]
fn test_import_file_rejects_unknown_kind() {
    let (_tmp, state) = create_test_state().unwrap();
    let csv = write_csv(
        SAMPLES_HEADER,
        &[&["Ana Souza", "15/03/1990", "Maria", "P1", "F", "Sim", ""]],
    )
    .unwrap();

    let result = state.import_api.import_file(
        csv.path().to_str().unwrap(),
        Some("exames"),
        None,
        None,
    );

    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    assert_eq!(state.patient_api.dashboard_stats().unwrap().total_patients, 0);
    assert!(state.import_api.list_batches(10).unwrap().is_empty());
}

#[test]
fn test_import_file_missing_path() {
    let (_tmp, state) = create_test_state().unwrap();
    let result = state
        .import_api
        .import_file("/nonexistent/planilha.csv", None, None, None);
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[test]
fn test_review_queue_and_resolution() {
    let (_tmp, state) = create_test_state().unwrap();
    let first = write_csv(
        CLINICAL_HEADER,
        &[&["Ana Souza", "15/03/1990", "Maria", "P1", "10", "90", ""]],
    )
    .unwrap();
    let second = write_csv(
        CLINICAL_HEADER,
        &[&["Ana Souza", "15/03/1990", "Maria", "P1", "20", "95", ""]],
    )
    .unwrap();

    state
        .import_api
        .import_file(first.path().to_str().unwrap(), Some("dados_clinicos"), None, None)
        .unwrap();
    let summary = state
        .import_api
        .import_file(second.path().to_str().unwrap(), Some("dados_clinicos"), None, None)
        .unwrap();
    assert_eq!(summary.batch.conflict_count, 2);

    let groups = state.import_api.list_pending_conflicts(None).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].nome_paciente, "Ana Souza");
    assert_eq!(groups[0].conflicts.len(), 2);

    let conflict_id = groups[0].conflicts[0].id;
    let resolved = state
        .import_api
        .resolve_conflict(conflict_id, "novo", Some("revisora"))
        .unwrap();
    assert_eq!(resolved.resolved_by.as_deref(), Some("revisora"));

    let again = state
        .import_api
        .resolve_conflict(conflict_id, "existing", None);
    assert!(matches!(
        again,
        Err(ApiError::InvalidStateTransition { ref to, .. }) if to == "resolved"
    ));

    let bad_choice = state
        .import_api
        .resolve_conflict(groups[0].conflicts[1].id, "merge", None);
    assert!(matches!(bad_choice, Err(ApiError::InvalidInput(_))));

    let ignored = state
        .import_api
        .ignore_conflict(groups[0].conflicts[1].id, None)
        .unwrap();
    assert_eq!(ignored.resolved_by.as_deref(), Some("system"));

    let ignore_again = state
        .import_api
        .ignore_conflict(groups[0].conflicts[1].id, None);
    assert!(matches!(
        ignore_again,
        Err(ApiError::InvalidStateTransition { ref from, ref to }) if from == "ignored" && to == "ignored"
    ));

    assert!(state.import_api.list_pending_conflicts(None).unwrap().is_empty());
    let detail = state.patient_api.get_patient_detail(groups[0].patient_id).unwrap();
    assert!(detail.pending_conflicts.is_empty());
    assert_eq!(detail.closed_conflicts.len(), 2);
}

#[test]
fn test_replace_mode_overwrites_without_conflicts() {
    let (_tmp, state) = create_test_state().unwrap();
    let first = write_csv(
        CLINICAL_HEADER,
        &[&["Ana Souza", "15/03/1990", "Maria", "P1", "10", "", ""]],
    )
    .unwrap();
    let second = write_csv(
        CLINICAL_HEADER,
        &[&["Ana Souza", "15/03/1990", "Maria", "P1", "20", "", ""]],
    )
    .unwrap();

    state
        .import_api
        .import_file(first.path().to_str().unwrap(), None, None, None)
        .unwrap();
    let summary = state
        .import_api
        .import_file(second.path().to_str().unwrap(), None, Some(false), None)
        .unwrap();

    assert_eq!(summary.report.updated, 1);
    assert!(!summary.batch.create_conflicts);
    let patient_id = summary.report.details[0].patient_id.unwrap();
    let patient = state.patient_api.get_patient(patient_id).unwrap();
    assert_eq!(patient.attributes.cars.as_deref(), Some("20"));
    assert_eq!(state.patient_api.dashboard_stats().unwrap().pending_conflicts, 0);
}

#[test]
fn test_configured_default_kind_is_used() {
    let (_tmp, state) = create_test_state().unwrap();
    state
        .config
        .set_global_config_value(config_keys::DEFAULT_RECORD_KIND, "bioinformatica")
        .unwrap();
    // no characteristic columns at all: auto would pick samples
    let csv = write_csv(
        &["Nome paciente", "Data de nascimento", "Nome da mãe", "Outros"],
        &[&["Ana Souza", "15/03/1990", "Maria", "WGS"]],
    )
    .unwrap();

    let summary = state
        .import_api
        .import_file(csv.path().to_str().unwrap(), None, None, None)
        .unwrap();

    assert_eq!(summary.report.record_kind, RecordKind::Bioinformatics);
    let patient_id = summary.report.details[0].patient_id.unwrap();
    let patient = state.patient_api.get_patient(patient_id).unwrap();
    assert_eq!(patient.attributes.outros_bioinfo.as_deref(), Some("WGS"));
}

#[test]
fn test_batch_resolution_requires_items() {
    let (_tmp, state) = create_test_state().unwrap();
    let result = state.import_api.resolve_conflicts(&[], None);
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    let response = state
        .import_api
        .resolve_conflicts(
            &[ResolutionRequest {
                conflict_id: 77,
                choice: ResolutionChoice::Existing,
            }],
            None,
        )
        .unwrap();
    assert_eq!(response.success_count, 0);
    assert_eq!(response.fail_count, 1);
}

#[test]
fn test_manual_create_checks_duplicates() {
    let (_tmp, state) = create_test_state().unwrap();
    let birth = NaiveDate::from_ymd_opt(1990, 3, 15).unwrap();

    let created = state
        .patient_api
        .create_patient(&new_patient("Élisa Prado", birth, "Joana"))
        .unwrap();
    let CreatePatientOutcome::Created(record) = created else {
        panic!("expected a new patient");
    };
    assert!(record.id_unico.starts_with("PSB_Un"));

    let again = state
        .patient_api
        .create_patient(&new_patient("élisa prado", birth, "JOANA"))
        .unwrap();
    assert!(matches!(again, CreatePatientOutcome::AlreadyExists(ref p) if p.id == record.id));
    assert_eq!(state.patient_api.dashboard_stats().unwrap().total_patients, 1);

    let blank = state
        .patient_api
        .create_patient(&new_patient("  ", birth, "Joana"));
    assert!(matches!(blank, Err(ApiError::InvalidInput(_))));
}

#[test]
fn test_search_filters_combine() {
    let (_tmp, state) = create_test_state().unwrap();
    let csv = write_csv(
        SAMPLES_HEADER,
        &[
            &["João Álvares", "15/03/1990", "Maria", "AUTISMO-01", "M", "", ""],
            &["Joana Reis", "15/03/1990", "Clara", "TEA-02", "F", "", ""],
            &["Pedro Reis", "1991-07-01", "Clara", "TEA-02", "M", "", ""],
        ],
    )
    .unwrap();
    state
        .import_api
        .import_file(csv.path().to_str().unwrap(), None, None, None)
        .unwrap();

    let by_name = state
        .patient_api
        .search_patients(&PatientFilter {
            name_contains: Some("JOÃO".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].nome_paciente, "João Álvares");

    let by_project_and_date = state
        .patient_api
        .search_patients(&PatientFilter {
            birth_date: NaiveDate::from_ymd_opt(1990, 3, 15),
            project_contains: Some("tea".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_project_and_date.len(), 1);
    assert_eq!(by_project_and_date[0].nome_paciente, "Joana Reis");

    let everyone = state.patient_api.search_patients(&PatientFilter::default()).unwrap();
    assert_eq!(everyone.len(), 3);

    let projects = state.patient_api.list_projects().unwrap();
    assert_eq!(projects, vec!["AUTISMO-01".to_string(), "TEA-02".to_string()]);
}

#[test]
fn test_delete_patient_and_dashboard() {
    let (_tmp, state) = create_test_state().unwrap();
    let first = write_csv(
        CLINICAL_HEADER,
        &[&["Ana Souza", "15/03/1990", "Maria", "P1", "10", "", ""]],
    )
    .unwrap();
    let second = write_csv(
        CLINICAL_HEADER,
        &[&["Ana Souza", "15/03/1990", "Maria", "P1", "20", "", ""]],
    )
    .unwrap();
    state
        .import_api
        .import_file(first.path().to_str().unwrap(), None, None, None)
        .unwrap();
    let summary = state
        .import_api
        .import_file(second.path().to_str().unwrap(), None, None, None)
        .unwrap();

    let stats = state.patient_api.dashboard_stats().unwrap();
    assert_eq!(stats.total_patients, 1);
    assert_eq!(stats.pending_conflicts, 1);
    assert_eq!(stats.recent_patients.len(), 1);

    let patient_id = summary.report.details[0].patient_id.unwrap();
    state.patient_api.delete_patient(patient_id).unwrap();

    let stats = state.patient_api.dashboard_stats().unwrap();
    assert_eq!(stats.total_patients, 0);
    assert_eq!(stats.pending_conflicts, 0);

    let missing = state.patient_api.delete_patient(patient_id);
    assert!(matches!(missing, Err(ApiError::NotFound(_))));
}

#[test]
fn test_update_patient_replaces_attributes_only() {
    let (_tmp, state) = create_test_state().unwrap();
    let birth = NaiveDate::from_ymd_opt(1990, 3, 15).unwrap();
    let mut patient = new_patient("Ana Souza", birth, "Maria");
    patient.attributes.cars = Some("10".to_string());
    let CreatePatientOutcome::Created(created) = state.patient_api.create_patient(&patient).unwrap()
    else {
        panic!("expected a new patient");
    };

    let mut attributes = created.attributes.clone();
    attributes.cars = Some("12".to_string());
    attributes.qi = Some("101".to_string());
    attributes.data_nascimento_mae = NaiveDate::from_ymd_opt(1965, 1, 2);
    let updated = state
        .patient_api
        .update_patient(created.id, &attributes)
        .unwrap();

    assert_eq!(updated.attributes, attributes);
    assert_eq!(updated.identity(), created.identity());
    assert_eq!(updated.id_unico, created.id_unico);
    assert!(updated.updated_at >= created.updated_at);

    let stored = state.patient_api.get_patient(created.id).unwrap();
    assert_eq!(stored.attributes.cars.as_deref(), Some("12"));
    assert_eq!(stored.attributes.qi.as_deref(), Some("101"));
    assert_eq!(stored.attributes.data_nascimento_mae, NaiveDate::from_ymd_opt(1965, 1, 2));
    assert_eq!(stored.nome_paciente, "Ana Souza");

    // a later import still matches the unchanged identity
    let csv = write_csv(
        CLINICAL_HEADER,
        &[&["Ana Souza", "15/03/1990", "Maria", "", "12", "101", ""]],
    )
    .unwrap();
    let summary = state
        .import_api
        .import_file(csv.path().to_str().unwrap(), None, None, None)
        .unwrap();
    assert_eq!(summary.report.updated, 1);
    assert_eq!(summary.report.details[0].patient_id, Some(created.id));
    assert!(summary.report.conflicts.is_empty());

    let missing = state.patient_api.update_patient(9999, &attributes);
    assert!(matches!(missing, Err(ApiError::NotFound(_))));
}
