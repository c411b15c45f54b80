// ==========================================
// Patient Registry - column mapper
// ==========================================
// One fixed table per record kind: canonical field -> source label(s).
// Date fields go through normalize_date, everything else through
// normalize_scalar. The clinical sheet's ID_Unico column is never read:
// the unique id belongs to the store.
// ==========================================

use crate::domain::patient::{CandidateRecord, PatientField, ISO_DATE_FORMAT};
use crate::domain::types::RecordKind;
use crate::importer::cell::RawRow;
use crate::importer::patient_importer_trait::FieldMapper;
use crate::importer::value_normalizer::{normalize_date, normalize_scalar};

// ===== identity labels (every kind) =====
pub const LABEL_NOME_PACIENTE: &str = "Nome paciente";
pub const LABEL_DATA_NASCIMENTO: &str = "Data de nascimento";
pub const LABEL_NOME_MAE: &str = "Nome da mãe";

/// Canonical field and its accepted labels; the first label present wins
pub type ColumnRule = (PatientField, &'static [&'static str]);

const SAMPLES_TABLE: &[ColumnRule] = &[
    (PatientField::IdProjeto, &["ID_Projeto"]),
    (PatientField::Sexo, &["Sexo"]),
    (PatientField::Rg, &["RG"]),
    (PatientField::Cpf, &["CPF"]),
    (PatientField::Cid10, &["CID10"]),
    (PatientField::DataNascimentoMae, &["Data de nascimento da mãe"]),
    (PatientField::IdFamiliar, &["ID_Familiar"]),
    (PatientField::IdLpcBiob, &["ID_LPC_BIOB"]),
    (PatientField::AmostraBiologica, &["Amostra_biologica"]),
    (PatientField::Sangue, &["Sangue"]),
    (PatientField::Plasma, &["Plasma"]),
    (PatientField::Soro, &["Soro"]),
    (PatientField::PaxGene, &["PaxGene"]),
    (PatientField::Saliva, &["Saliva"]),
    (PatientField::Scu, &["SCU"]),
    (PatientField::Placenta, &["Placenta"]),
    (PatientField::PlacentaFfpe, &["Placenta_FFPE"]),
    (PatientField::Dna, &["DNA"]),
    (PatientField::Rna, &["RNA"]),
    (PatientField::Proteina, &["Proteína"]),
];

const BIOINFORMATICS_TABLE: &[ColumnRule] = &[
    (PatientField::IdProjeto, &["ID_Projeto"]),
    (PatientField::Sexo, &["Sexo"]),
    (PatientField::DataNascimentoMae, &["Data de nascimento da mãe"]),
    (PatientField::Metiloma, &["Metiloma"]),
    (PatientField::DnamGene, &["DNAm_gene"]),
    (PatientField::DnaSeq, &["DNA_Seq"]),
    (PatientField::Exoma, &["Exoma"]),
    (PatientField::RnaSeq, &["RNA_Seq"]),
    (PatientField::MiRna, &["miRNA"]),
    (PatientField::ComprimentoTelomerico, &["Comprimento_telomerico"]),
    (PatientField::Citocinas, &["Citocinas"]),
    (PatientField::Cortisol, &["Cortisol"]),
    (PatientField::Exossomos, &["Exossomos"]),
    (PatientField::Prs, &["PRS"]),
    (PatientField::OutrosBioinfo, &["Outros"]),
];

// Projeto_originall / Score_Psiquiatruci_mãe are the labels the clinical
// export really uses; the corrected spellings are accepted too.
const CLINICAL_TABLE: &[ColumnRule] = &[
    (PatientField::ProjetoOriginal, &["Projeto_originall", "Projeto_original"]),
    (PatientField::IdProjeto, &["ID_Projeto"]),
    (PatientField::Sexo, &["Sexo"]),
    (PatientField::Rg, &["RG"]),
    (PatientField::Cpf, &["CPF"]),
    (PatientField::Cid10, &["CID10"]),
    (PatientField::DataNascimentoMae, &["Data de nascimento da mãe"]),
    (PatientField::IdFamiliar, &["ID_Familiar"]),
    (PatientField::HistoricoMaterno, &["Historico_materno"]),
    (PatientField::HistoricoGravidez, &["Historico_gravidez"]),
    (PatientField::HistoricoFamiliar, &["Historico_familiar"]),
    (PatientField::InfoParto, &["Info_parto"]),
    (PatientField::Cars, &["CARS"]),
    (PatientField::Qi, &["QI"]),
    (PatientField::ComunicacaoVineland, &["comunicação_Vineland"]),
    (PatientField::HabDiaVineland, &["Hab.dia a dia_Vineland"]),
    (PatientField::SocializacaoVineland, &["Socialização_Vineland"]),
    (PatientField::AdiTotal, &["ADI_total"]),
    (PatientField::CbclInternal, &["CBCL_Internal"]),
    (PatientField::CbclExternal, &["CBCL_External"]),
    (PatientField::ScorePsiquiatricoMae, &["Score_Psiquiatruci_mãe", "Score_Psiquiatrico_mãe"]),
    (PatientField::ScoreExposicaoAmbiental, &["Score exposição ambiental na gestação"]),
    (PatientField::ScoreEstresseMaterno, &["Score estresse materno"]),
    (PatientField::EscolaridadeMaterna, &["Escolaridade materna"]),
    (PatientField::RendaFamiliar, &["Renda familiar"]),
];

/// Mapping table of a record kind
pub fn column_table(kind: RecordKind) -> &'static [ColumnRule] {
    match kind {
        RecordKind::Samples => SAMPLES_TABLE,
        RecordKind::Bioinformatics => BIOINFORMATICS_TABLE,
        RecordKind::Clinical => CLINICAL_TABLE,
    }
}

fn is_date_field(field: PatientField) -> bool {
    matches!(field, PatientField::DataNascimentoMae)
}

// ==========================================
// ColumnMapper
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnMapper;

impl FieldMapper for ColumnMapper {
    fn map_row(&self, kind: RecordKind, row: &RawRow) -> CandidateRecord {
        let mut candidate = CandidateRecord {
            nome_paciente: normalize_scalar(row.get(LABEL_NOME_PACIENTE)),
            data_nascimento: normalize_date(row.get(LABEL_DATA_NASCIMENTO)),
            nome_mae: normalize_scalar(row.get(LABEL_NOME_MAE)),
            ..Default::default()
        };

        for (field, labels) in column_table(kind) {
            let cell = labels.iter().find_map(|label| row.get(*label));
            let value = if is_date_field(*field) {
                normalize_date(cell).map(|d| d.format(ISO_DATE_FORMAT).to_string())
            } else {
                normalize_scalar(cell)
            };
            field.set(&mut candidate.attributes, value);
        }

        candidate
    }
}
