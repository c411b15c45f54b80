//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use patient_registry::importer::value_normalizer::parse_date_text;

#[derive(Parser)]
#[command(
    name = "patient-registry",
    version,
    about = "Patient research registry - spreadsheet import and reconciliation",
    long_about = "Import sample, bioinformatics and clinical spreadsheets into one\n\
                  record per patient. Disagreeing values are queued as conflicts\n\
                  for review."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite database file (default: PATIENT_REGISTRY_DB_PATH or the user data directory).
    #[arg(long = "db", value_name = "PATH", global = true)]
    pub db: Option<PathBuf>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the database schema and exit.
    Init,

    /// Import a CSV or Excel sheet.
    Import(ImportArgs),

    /// List pending conflicts grouped by patient.
    Conflicts {
        /// Only conflicts of this patient.
        #[arg(long = "patient", value_name = "ID")]
        patient: Option<i64>,
    },

    /// Resolve a conflict by keeping the stored value or adopting the new one.
    Resolve {
        #[arg(value_name = "CONFLICT_ID")]
        conflict_id: i64,

        /// existing | new
        #[arg(value_name = "CHOICE")]
        choice: String,

        /// Resolver identity (default: configured operator).
        #[arg(long = "user")]
        user: Option<String>,
    },

    /// Dismiss a conflict without changing the patient.
    Ignore {
        #[arg(value_name = "CONFLICT_ID")]
        conflict_id: i64,

        #[arg(long = "user")]
        user: Option<String>,
    },

    /// Search patients.
    Patients(SearchArgs),

    /// Show one patient with its conflicts.
    Show {
        #[arg(value_name = "PATIENT_ID")]
        patient_id: i64,
    },

    /// Register a patient by hand (skipped when the identity already exists).
    Add(AddArgs),

    /// Change attributes of a stored patient (an empty VALUE clears the field).
    Edit {
        #[arg(value_name = "PATIENT_ID")]
        patient_id: i64,

        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_key_value, required = true)]
        set: Vec<(String, String)>,
    },

    /// Delete a patient and its conflicts.
    Delete {
        #[arg(value_name = "PATIENT_ID")]
        patient_id: i64,
    },

    /// Registry totals and the latest patients.
    Stats,

    /// Import history.
    Batches {
        #[arg(long = "limit", default_value_t = 20)]
        limit: usize,
    },

    /// Show or change runtime settings.
    Config {
        /// KEY=VALUE pairs to store before printing.
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        set: Vec<(String, String)>,
    },
}

#[derive(Parser)]
pub struct ImportArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// amostras | bioinformatica | dados_clinicos | auto (default: configured kind).
    #[arg(long = "kind")]
    pub kind: Option<String>,

    /// Overwrite differing values instead of creating conflicts.
    #[arg(long = "replace")]
    pub replace: bool,

    /// Operator recorded on the import batch.
    #[arg(long = "user")]
    pub user: Option<String>,

    /// Print the full report as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct SearchArgs {
    #[arg(long = "name")]
    pub name: Option<String>,

    #[arg(long = "birth-date", value_parser = parse_date_arg)]
    pub birth_date: Option<NaiveDate>,

    #[arg(long = "mother")]
    pub mother: Option<String>,

    #[arg(long = "project")]
    pub project: Option<String>,
}

#[derive(Parser)]
pub struct AddArgs {
    #[arg(long = "name")]
    pub name: String,

    #[arg(long = "birth-date", value_parser = parse_date_arg)]
    pub birth_date: NaiveDate,

    #[arg(long = "mother")]
    pub mother: String,

    /// Extra attributes as FIELD=VALUE (canonical field names).
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date_text(raw).ok_or_else(|| format!("invalid date: {raw}"))
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {raw}"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
