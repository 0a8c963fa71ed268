//! Document kind enum for envelope dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported YAML document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    Ruleset,
    ScoringProfiles,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Ruleset => write!(f, "Ruleset"),
            DocumentKind::ScoringProfiles => write!(f, "ScoringProfiles"),
        }
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Ruleset" => Ok(DocumentKind::Ruleset),
            "ScoringProfiles" => Ok(DocumentKind::ScoringProfiles),
            other => Err(format!("unknown document kind: '{}'", other)),
        }
    }
}
