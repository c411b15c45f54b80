// ==========================================
// Patient Registry - command-line entry point
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use patient_registry::api::{CreatePatientOutcome, PatientConflictGroup};
use patient_registry::app::{get_default_db_path, AppState};
use patient_registry::domain::{
    ImportSummary, NewPatient, PatientAttributes, PatientField, PatientFilter, PatientIdentity,
    PatientRecord, RowStatus,
};
use patient_registry::logging;

mod cli;

use crate::cli::{AddArgs, Cli, Command, ImportArgs, LogFormatArg, SearchArgs};

fn main() {
    let cli = Cli::parse();
    match cli.log_format {
        LogFormatArg::Pretty => logging::init(),
        LogFormatArg::Json => logging::init_json(),
    }

    if let Err(error) = run(cli) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let db_path = match &cli.db {
        Some(path) => path.to_string_lossy().to_string(),
        None => get_default_db_path(),
    };
    tracing::debug!(db_path = %db_path, version = patient_registry::VERSION, "starting");

    let state = AppState::new(db_path.clone())
        .with_context(|| format!("cannot open registry at {db_path}"))?;

    match cli.command {
        Command::Init => {
            println!("Database ready: {}", state.db_path);
        }
        Command::Import(args) => run_import(&state, &args)?,
        Command::Conflicts { patient } => {
            let groups = state.import_api.list_pending_conflicts(patient)?;
            print_conflict_groups(&groups);
        }
        Command::Resolve {
            conflict_id,
            choice,
            user,
        } => {
            let conflict = state
                .import_api
                .resolve_conflict(conflict_id, &choice, user.as_deref())?;
            println!(
                "Conflict {} resolved: {} = {}",
                conflict.id,
                conflict.field,
                conflict.chosen_value.unwrap_or_default()
            );
        }
        Command::Ignore { conflict_id, user } => {
            let conflict = state.import_api.ignore_conflict(conflict_id, user.as_deref())?;
            println!("Conflict {} ignored", conflict.id);
        }
        Command::Patients(args) => {
            let patients = state.patient_api.search_patients(&search_filter(args))?;
            for patient in &patients {
                print_patient_line(patient);
            }
            println!("{} patient(s)", patients.len());
        }
        Command::Show { patient_id } => {
            let detail = state.patient_api.get_patient_detail(patient_id)?;
            print_patient(&detail.patient);
            println!("Pending conflicts: {}", detail.pending_conflicts.len());
            for conflict in &detail.pending_conflicts {
                println!(
                    "  #{} {}: stored={:?} incoming={:?}",
                    conflict.id, conflict.field, conflict.existing_value, conflict.new_value
                );
            }
            println!("Closed conflicts: {}", detail.closed_conflicts.len());
        }
        Command::Add(args) => {
            let patient = new_patient(args)?;
            match state.patient_api.create_patient(&patient)? {
                CreatePatientOutcome::Created(p) => println!("Registered {} ({})", p.id_unico, p),
                CreatePatientOutcome::AlreadyExists(p) => {
                    println!("Already registered as {} ({})", p.id_unico, p)
                }
            }
        }
        Command::Edit { patient_id, set } => {
            let mut attributes = state.patient_api.get_patient(patient_id)?.attributes;
            apply_assignments(&mut attributes, &set)?;
            let updated = state.patient_api.update_patient(patient_id, &attributes)?;
            print_patient(&updated);
        }
        Command::Delete { patient_id } => {
            state.patient_api.delete_patient(patient_id)?;
            println!("Patient {patient_id} deleted");
        }
        Command::Stats => {
            let stats = state.patient_api.dashboard_stats()?;
            println!("Patients: {}", stats.total_patients);
            println!("Pending conflicts: {}", stats.pending_conflicts);
            println!("Latest:");
            for patient in &stats.recent_patients {
                print_patient_line(patient);
            }
            let projects = state.patient_api.list_projects()?;
            if !projects.is_empty() {
                println!("Projects: {}", projects.join(", "));
            }
        }
        Command::Batches { limit } => {
            for batch in state.import_api.list_batches(limit)? {
                println!(
                    "{} {} {} {} total={} new={} updated={} conflicted={} errors={}",
                    batch.imported_at.format("%Y-%m-%d %H:%M:%S"),
                    batch.batch_id,
                    batch.file_name.as_deref().unwrap_or("-"),
                    batch.record_kind,
                    batch.total_rows,
                    batch.new_rows,
                    batch.updated_rows,
                    batch.conflicted_rows,
                    batch.errored_rows
                );
            }
        }
        Command::Config { set } => {
            for (key, value) in &set {
                state.config.set_global_config_value(key, value)?;
            }
            for (key, value) in state.config.get_config_snapshot()? {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}

fn run_import(state: &AppState, args: &ImportArgs) -> Result<()> {
    let path = args.file.to_string_lossy().to_string();
    let create_conflicts = if args.replace { Some(false) } else { None };
    let summary = state.import_api.import_file(
        &path,
        args.kind.as_deref(),
        create_conflicts,
        args.user.as_deref(),
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_import_summary(&summary);
    }
    Ok(())
}

fn search_filter(args: SearchArgs) -> PatientFilter {
    PatientFilter {
        name_contains: args.name,
        birth_date: args.birth_date,
        mother_contains: args.mother,
        project_contains: args.project,
    }
}

/// FIELD=VALUE pairs onto `attributes`; an empty value clears the field
fn apply_assignments(attributes: &mut PatientAttributes, set: &[(String, String)]) -> Result<()> {
    for (name, value) in set {
        let field = PatientField::from_name(name).ok_or_else(|| anyhow!("unknown field: {name}"))?;
        field.set(attributes, Some(value.clone()));
        if field.get(attributes).is_none() && !value.is_empty() {
            bail!("invalid value for {name}: {value}");
        }
    }
    Ok(())
}

fn new_patient(args: AddArgs) -> Result<NewPatient> {
    let mut attributes = PatientAttributes::default();
    apply_assignments(&mut attributes, &args.set)?;
    Ok(NewPatient {
        identity: PatientIdentity {
            nome_paciente: args.name.trim().to_string(),
            data_nascimento: args.birth_date,
            nome_mae: args.mother.trim().to_string(),
        },
        attributes,
    })
}

// ==========================================
// output
// ==========================================

fn print_import_summary(summary: &ImportSummary) {
    let report = &summary.report;
    println!("Batch: {}", summary.batch.batch_id);
    println!("Kind: {}", report.record_kind);
    println!(
        "Rows: {} (new {}, updated {}, conflicted {}, errors {})",
        report.total, report.new, report.updated, report.conflicted, report.errored
    );
    println!("Conflicts created: {}", report.conflicts.len());
    for detail in report.details.iter().filter(|d| d.status == RowStatus::Error) {
        println!(
            "  row {}: {}",
            detail.row,
            detail.message.as_deref().unwrap_or("rejected")
        );
    }
}

fn print_conflict_groups(groups: &[PatientConflictGroup]) {
    if groups.is_empty() {
        println!("No pending conflicts");
        return;
    }
    for group in groups {
        println!(
            "{} {} (patient {})",
            group.id_unico, group.nome_paciente, group.patient_id
        );
        for conflict in &group.conflicts {
            println!(
                "  #{} {}: stored={:?} incoming={:?}",
                conflict.id, conflict.field, conflict.existing_value, conflict.new_value
            );
        }
    }
}

fn print_patient_line(patient: &PatientRecord) {
    println!(
        "{:>6} {:<14} {} | mother: {} | project: {}",
        patient.id,
        patient.id_unico,
        patient,
        patient.nome_mae,
        patient.attributes.id_projeto.as_deref().unwrap_or("-")
    );
}

fn print_patient(patient: &PatientRecord) {
    println!("{} ({})", patient.id_unico, patient);
    println!("  nome_mae: {}", patient.nome_mae);
    for (field, value) in patient.attributes.filled() {
        println!("  [{}] {}: {}", field.category(), field.label(), value);
    }
    println!(
        "  created {} / updated {}",
        patient.created_at.format("%Y-%m-%d %H:%M:%S"),
        patient.updated_at.format("%Y-%m-%d %H:%M:%S")
    );
}
