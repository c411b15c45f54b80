// ==========================================
// Patient Registry - schema detector
// ==========================================
// Column labels -> record kind, by overlap with a reference set per kind.
// Highest score wins; ties go to the earlier kind in RecordKind::ALL
// (samples, then bioinformatics, then clinical).
// ==========================================

use crate::domain::types::RecordKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const SAMPLES_COLUMNS: [&str; 6] = ["Amostra_biologica", "Sangue", "Plasma", "Soro", "DNA", "RNA"];
const BIOINFORMATICS_COLUMNS: [&str; 6] = ["Metiloma", "DNAm_gene", "Exoma", "RNA_Seq", "miRNA", "PRS"];
const CLINICAL_COLUMNS: [&str; 5] = ["Historico_materno", "CARS", "QI", "ADI_total", "CBCL_Internal"];

/// Characteristic columns of a kind (exact, case-sensitive)
pub fn reference_columns(kind: RecordKind) -> &'static [&'static str] {
    match kind {
        RecordKind::Samples => &SAMPLES_COLUMNS,
        RecordKind::Bioinformatics => &BIOINFORMATICS_COLUMNS,
        RecordKind::Clinical => &CLINICAL_COLUMNS,
    }
}

/// Overlap score per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectionScores {
    pub samples: usize,
    pub bioinformatics: usize,
    pub clinical: usize,
}

impl DetectionScores {
    pub fn score(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Samples => self.samples,
            RecordKind::Bioinformatics => self.bioinformatics,
            RecordKind::Clinical => self.clinical,
        }
    }
}

/// Pick the record kind whose reference set overlaps `columns` the most
pub fn detect_record_kind<S: AsRef<str>>(columns: &[S]) -> (RecordKind, DetectionScores) {
    let present: HashSet<&str> = columns.iter().map(|c| c.as_ref()).collect();
    let overlap = |kind: RecordKind| {
        reference_columns(kind)
            .iter()
            .filter(|label| present.contains(*label))
            .count()
    };

    let scores = DetectionScores {
        samples: overlap(RecordKind::Samples),
        bioinformatics: overlap(RecordKind::Bioinformatics),
        clinical: overlap(RecordKind::Clinical),
    };

    let mut best = RecordKind::ALL[0];
    for kind in RecordKind::ALL.iter().copied().skip(1) {
        if scores.score(kind) > scores.score(best) {
            best = kind;
        }
    }

    (best, scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_each_kind() {
        let (kind, scores) = detect_record_kind(&["Nome paciente", "Sangue", "Plasma", "DNA"]);
        assert_eq!(kind, RecordKind::Samples);
        assert_eq!(scores.samples, 3);

        let (kind, _) = detect_record_kind(&["Metiloma", "Exoma", "PRS"]);
        assert_eq!(kind, RecordKind::Bioinformatics);

        let (kind, scores) = detect_record_kind(&["CARS", "QI", "Sangue"]);
        assert_eq!(kind, RecordKind::Clinical);
        assert_eq!(scores.clinical, 2);
        assert_eq!(scores.samples, 1);
    }

    #[test]
    fn test_ties_prefer_samples_then_bioinformatics() {
        let (kind, _) = detect_record_kind(&["Sangue", "Metiloma", "CARS"]);
        assert_eq!(kind, RecordKind::Samples);

        let (kind, _) = detect_record_kind(&["Metiloma", "CARS"]);
        assert_eq!(kind, RecordKind::Bioinformatics);
    }

    #[test]
    fn test_two_way_tie_without_third_kind() {
        let (kind, scores) = detect_record_kind(&["Sangue", "Plasma", "Metiloma", "Exoma"]);
        assert_eq!((scores.samples, scores.bioinformatics, scores.clinical), (2, 2, 0));
        assert_eq!(kind, RecordKind::Samples);

        let (kind, scores) = detect_record_kind(&["Metiloma", "PRS", "CARS", "QI"]);
        assert_eq!((scores.samples, scores.bioinformatics, scores.clinical), (0, 2, 2));
        assert_eq!(kind, RecordKind::Bioinformatics);
    }

    #[test]
    fn test_no_overlap_resolves_to_samples() {
        let (kind, scores) = detect_record_kind(&["foo", "bar"]);
        assert_eq!(kind, RecordKind::Samples);
        assert_eq!(scores, DetectionScores::default());

        let empty: [&str; 0] = [];
        assert_eq!(detect_record_kind(&empty).0, RecordKind::Samples);
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        let (kind, scores) = detect_record_kind(&["cars", "qi", "Sangue"]);
        assert_eq!(scores.clinical, 0);
        assert_eq!(kind, RecordKind::Samples);
    }
}
