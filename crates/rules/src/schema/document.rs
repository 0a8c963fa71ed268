//! YAML documents wrapping ruleset snapshots and scoring profiles.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{CommonMetadata, DocumentEnvelope, DocumentKind, RuleGroup, Ruleset};
use crate::error::DocumentError;
use crate::scoring::ScoringProfilesDocument;

/// A fully deserialized document of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Ruleset(RulesetDocument),
    ScoringProfiles(ScoringProfilesDocument),
}

impl Document {
    /// Parse any supported document, dispatching on `kind`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DocumentError> {
        let envelope: DocumentEnvelope = serde_yaml::from_str(yaml)?;
        envelope.parse_full().map_err(DocumentError::Invalid)
    }

    pub fn metadata(&self) -> &CommonMetadata {
        match self {
            Document::Ruleset(doc) => &doc.metadata,
            Document::ScoringProfiles(doc) => &doc.metadata,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::Ruleset(_) => DocumentKind::Ruleset,
            Document::ScoringProfiles(_) => DocumentKind::ScoringProfiles,
        }
    }
}

/// `kind: Ruleset` document as authored in YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RulesetDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: RulesetSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RulesetSpec {
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

impl RulesetDocument {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DocumentError> {
        let doc: RulesetDocument = serde_yaml::from_str(yaml)?;
        if doc.kind != DocumentKind::Ruleset.to_string() {
            return Err(DocumentError::WrongKind {
                expected: DocumentKind::Ruleset.to_string(),
                found: doc.kind,
            });
        }
        Ok(doc)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// The snapshot handed to the engine.
    pub fn into_ruleset(self) -> Ruleset {
        Ruleset {
            id: self.metadata.id,
            name: self.metadata.name,
            version: self.metadata.version,
            groups: self.spec.groups,
        }
    }
}
