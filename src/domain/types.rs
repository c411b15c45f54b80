// ==========================================
// Patient Registry - domain enums
// ==========================================
// Stored enums serialize to the same lowercase strings the database
// holds, so `as_str` and serde always agree.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// RecordKind - source sheet schema
// ==========================================
// Declaration order is the detector's tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    #[serde(rename = "amostras")]
    Samples,
    #[serde(rename = "bioinformatica")]
    Bioinformatics,
    #[serde(rename = "dados_clinicos")]
    Clinical,
}

impl RecordKind {
    /// Every kind, in tie-break priority order
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Samples,
        RecordKind::Bioinformatics,
        RecordKind::Clinical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Samples => "amostras",
            RecordKind::Bioinformatics => "bioinformatica",
            RecordKind::Clinical => "dados_clinicos",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// KindSelector - caller's choice of sheet kind
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KindSelector {
    Explicit(RecordKind),
    Auto,
}

impl KindSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            KindSelector::Explicit(kind) => kind.as_str(),
            KindSelector::Auto => "auto",
        }
    }
}

impl FromStr for KindSelector {
    type Err = String;

    /// Accepts `amostras`, `bioinformatica`, `dados_clinicos` or `auto`
    /// (exact, lowercase). Anything else is rejected with the raw value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amostras" => Ok(KindSelector::Explicit(RecordKind::Samples)),
            "bioinformatica" => Ok(KindSelector::Explicit(RecordKind::Bioinformatics)),
            "dados_clinicos" => Ok(KindSelector::Explicit(RecordKind::Clinical)),
            "auto" => Ok(KindSelector::Auto),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for KindSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// ConflictStatus - conflict lifecycle
// ==========================================
// pending -> resolved | ignored; both targets are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStatus {
    Pending,
    Resolved,
    Ignored,
}

impl ConflictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStatus::Pending => "pending",
            ConflictStatus::Resolved => "resolved",
            ConflictStatus::Ignored => "ignored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConflictStatus::Pending)
    }
}

impl FromStr for ConflictStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(ConflictStatus::Pending),
            "resolved" => Ok(ConflictStatus::Resolved),
            "ignored" => Ok(ConflictStatus::Ignored),
            other => Err(format!("unknown conflict status: {}", other)),
        }
    }
}

impl fmt::Display for ConflictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// ResolutionChoice - which side of a conflict wins
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionChoice {
    /// Keep the value already stored
    Existing,
    /// Adopt the incoming value
    New,
}

impl ResolutionChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionChoice::Existing => "existing",
            ResolutionChoice::New => "new",
        }
    }
}

impl FromStr for ResolutionChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "existing" | "existente" => Ok(ResolutionChoice::Existing),
            "new" | "novo" => Ok(ResolutionChoice::New),
            other => Err(format!("unknown resolution choice: {}", other)),
        }
    }
}

impl fmt::Display for ResolutionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
