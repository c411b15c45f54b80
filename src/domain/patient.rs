// ==========================================
// Patient Registry - patient domain model
// ==========================================
// Unified record combining biological samples, bioinformatics
// and clinical data for one research subject.
//
// Identity (used for duplicate detection, immutable once stored):
//   nome_paciente + data_nascimento + nome_mae
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity columns; never touched by the merge loop
pub const IDENTITY_FIELDS: [&str; 3] = ["nome_paciente", "data_nascimento", "nome_mae"];

/// Storage format for every date the registry writes
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

// ==========================================
// FieldValue - text form of a stored attribute
// ==========================================
// Attributes are compared and persisted as text; this trait is the only
// place a typed attribute crosses that boundary.
pub trait FieldValue: Sized {
    fn to_text(&self) -> String;
    fn from_text(raw: &str) -> Option<Self>;
}

impl FieldValue for String {
    fn to_text(&self) -> String {
        self.clone()
    }

    fn from_text(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl FieldValue for NaiveDate {
    fn to_text(&self) -> String {
        self.format(ISO_DATE_FORMAT).to_string()
    }

    fn from_text(raw: &str) -> Option<Self> {
        NaiveDate::parse_from_str(raw.trim(), ISO_DATE_FORMAT).ok()
    }
}

// ==========================================
// FieldCategory - semantic grouping of attributes
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Identification,
    BiologicalSamples,
    Bioinformatics,
    Clinical,
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldCategory::Identification => "Identification",
            FieldCategory::BiologicalSamples => "Biological samples",
            FieldCategory::Bioinformatics => "Bioinformatics",
            FieldCategory::Clinical => "Clinical",
        };
        write!(f, "{}", label)
    }
}

// ==========================================
// Attribute table
// ==========================================
// One line per canonical attribute generates:
// - the `PatientAttributes` struct field
// - the `PatientField` variant plus its name/label/category
// - the get/set accessors used by the merge loop and the store
macro_rules! patient_attributes {
    ($( $variant:ident => $field:ident : $ty:ty, $label:literal, $category:ident; )+) => {
        /// Optional, non-identity attributes of a patient
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct PatientAttributes {
            $( pub $field: Option<$ty>, )+
        }

        /// Canonical attribute names (column names in the `patient` table)
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum PatientField {
            $( $variant, )+
        }

        impl PatientField {
            /// Every attribute in canonical order; merge iterates in this order
            pub const ALL: &'static [PatientField] = &[ $( PatientField::$variant, )+ ];

            pub fn name(self) -> &'static str {
                match self {
                    $( PatientField::$variant => stringify!($field), )+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $( PatientField::$variant => $label, )+
                }
            }

            pub fn category(self) -> FieldCategory {
                match self {
                    $( PatientField::$variant => FieldCategory::$category, )+
                }
            }

            /// Text form of the attribute on `attributes` (None when blank)
            pub fn get(self, attributes: &PatientAttributes) -> Option<String> {
                match self {
                    $( PatientField::$variant => attributes.$field.as_ref().map(<$ty as FieldValue>::to_text), )+
                }
            }

            /// Overwrite the attribute from its text form
            pub fn set(self, attributes: &mut PatientAttributes, value: Option<String>) {
                match self {
                    $( PatientField::$variant => {
                        attributes.$field = value.as_deref().and_then(<$ty as FieldValue>::from_text);
                    } )+
                }
            }
        }
    };
}

patient_attributes! {
    // ----- project / identification -----
    IdProjeto => id_projeto: String, "ID Projeto", Identification;
    ProjetoOriginal => projeto_original: String, "Projeto Original", Identification;
    Sexo => sexo: String, "Sexo", Identification;
    Rg => rg: String, "RG", Identification;
    Cpf => cpf: String, "CPF", Identification;
    Cid10 => cid10: String, "CID10", Identification;
    DataNascimentoMae => data_nascimento_mae: NaiveDate, "Data Nascimento Mãe", Identification;
    IdFamiliar => id_familiar: String, "ID Familiar", Identification;
    IdLpcBiob => id_lpc_biob: String, "ID LPC BIOB", Identification;

    // ----- biological samples -----
    AmostraBiologica => amostra_biologica: String, "Amostra Biológica", BiologicalSamples;
    Sangue => sangue: String, "Sangue", BiologicalSamples;
    Plasma => plasma: String, "Plasma", BiologicalSamples;
    Soro => soro: String, "Soro", BiologicalSamples;
    PaxGene => pax_gene: String, "PaxGene", BiologicalSamples;
    Saliva => saliva: String, "Saliva", BiologicalSamples;
    Scu => scu: String, "SCU", BiologicalSamples;
    Placenta => placenta: String, "Placenta", BiologicalSamples;
    PlacentaFfpe => placenta_ffpe: String, "Placenta FFPE", BiologicalSamples;
    Dna => dna: String, "DNA", BiologicalSamples;
    Rna => rna: String, "RNA", BiologicalSamples;
    Proteina => proteina: String, "Proteína", BiologicalSamples;

    // ----- bioinformatics -----
    Metiloma => metiloma: String, "Metiloma", Bioinformatics;
    DnamGene => dnam_gene: String, "DNAm Gene", Bioinformatics;
    DnaSeq => dna_seq: String, "DNA Seq", Bioinformatics;
    Exoma => exoma: String, "Exoma", Bioinformatics;
    RnaSeq => rna_seq: String, "RNA Seq", Bioinformatics;
    MiRna => mi_rna: String, "miRNA", Bioinformatics;
    ComprimentoTelomerico => comprimento_telomerico: String, "Comprimento Telomérico", Bioinformatics;
    Citocinas => citocinas: String, "Citocinas", Bioinformatics;
    Cortisol => cortisol: String, "Cortisol", Bioinformatics;
    Exossomos => exossomos: String, "Exossomos", Bioinformatics;
    Prs => prs: String, "PRS", Bioinformatics;
    OutrosBioinfo => outros_bioinfo: String, "Outros (Bioinformática)", Bioinformatics;

    // ----- clinical / psychometric -----
    HistoricoMaterno => historico_materno: String, "Histórico Materno", Clinical;
    HistoricoGravidez => historico_gravidez: String, "Histórico de Gravidez", Clinical;
    HistoricoFamiliar => historico_familiar: String, "Histórico Familiar", Clinical;
    InfoParto => info_parto: String, "Informações do Parto", Clinical;
    Cars => cars: String, "CARS", Clinical;
    Qi => qi: String, "QI", Clinical;
    ComunicacaoVineland => comunicacao_vineland: String, "Comunicação Vineland", Clinical;
    HabDiaVineland => hab_dia_vineland: String, "Hab. Dia a Dia Vineland", Clinical;
    SocializacaoVineland => socializacao_vineland: String, "Socialização Vineland", Clinical;
    AdiTotal => adi_total: String, "ADI Total", Clinical;
    CbclInternal => cbcl_internal: String, "CBCL Internal", Clinical;
    CbclExternal => cbcl_external: String, "CBCL External", Clinical;
    ScorePsiquiatricoMae => score_psiquiatrico_mae: String, "Score Psiquiátrico Mãe", Clinical;
    ScoreExposicaoAmbiental => score_exposicao_ambiental: String, "Score Exposição Ambiental na Gestação", Clinical;
    ScoreEstresseMaterno => score_estresse_materno: String, "Score Estresse Materno", Clinical;
    EscolaridadeMaterna => escolaridade_materna: String, "Escolaridade Materna", Clinical;
    RendaFamiliar => renda_familiar: String, "Renda Familiar", Clinical;
}

impl PatientField {
    /// Look up an attribute by its canonical (column) name
    pub fn from_name(name: &str) -> Option<PatientField> {
        PatientField::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl fmt::Display for PatientField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl PatientAttributes {
    /// Attributes that currently hold a value, in canonical order
    pub fn filled(&self) -> Vec<(PatientField, String)> {
        PatientField::ALL
            .iter()
            .filter_map(|field| field.get(self).map(|value| (*field, value)))
            .collect()
    }
}

// ==========================================
// PatientIdentity - the three matching keys
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientIdentity {
    pub nome_paciente: String,
    pub data_nascimento: NaiveDate,
    pub nome_mae: String,
}

// ==========================================
// NewPatient - record not yet persisted
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub identity: PatientIdentity,
    pub attributes: PatientAttributes,
}

// ==========================================
// PatientRecord - persisted unified record
// ==========================================
// `id` is the storage sequence number; `id_unico` is derived from it
// exactly once, inside the insert transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: i64,
    pub id_unico: String,
    pub nome_paciente: String,
    pub data_nascimento: NaiveDate,
    pub nome_mae: String,
    pub attributes: PatientAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientRecord {
    pub fn identity(&self) -> PatientIdentity {
        PatientIdentity {
            nome_paciente: self.nome_paciente.clone(),
            data_nascimento: self.data_nascimento,
            nome_mae: self.nome_mae.clone(),
        }
    }
}

impl fmt::Display for PatientRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.nome_paciente,
            self.data_nascimento.format(ISO_DATE_FORMAT)
        )
    }
}

// ==========================================
// CandidateRecord - one mapped sheet row
// ==========================================
// Identity fields are optional here: a row missing any of them is
// rejected by the merge engine before touching the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub nome_paciente: Option<String>,
    pub data_nascimento: Option<NaiveDate>,
    pub nome_mae: Option<String>,
    pub attributes: PatientAttributes,
}

impl CandidateRecord {
    /// Names of the identity fields that are missing
    pub fn missing_identity_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.nome_paciente.as_deref().map_or(true, |v| v.trim().is_empty()) {
            missing.push(IDENTITY_FIELDS[0]);
        }
        if self.data_nascimento.is_none() {
            missing.push(IDENTITY_FIELDS[1]);
        }
        if self.nome_mae.as_deref().map_or(true, |v| v.trim().is_empty()) {
            missing.push(IDENTITY_FIELDS[2]);
        }
        missing
    }

    /// Complete identity, or None when any key is missing
    pub fn identity(&self) -> Option<PatientIdentity> {
        if !self.missing_identity_fields().is_empty() {
            return None;
        }
        Some(PatientIdentity {
            nome_paciente: self.nome_paciente.clone()?,
            data_nascimento: self.data_nascimento?,
            nome_mae: self.nome_mae.clone()?,
        })
    }
}

// ==========================================
// PatientFilter - search criteria
// ==========================================
// Each criterion is optional; present ones are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientFilter {
    /// Case-insensitive substring of nome_paciente
    pub name_contains: Option<String>,
    /// Exact birth date
    pub birth_date: Option<NaiveDate>,
    /// Case-insensitive substring of nome_mae
    pub mother_contains: Option<String>,
    /// Case-insensitive substring of id_projeto
    pub project_contains: Option<String>,
}
