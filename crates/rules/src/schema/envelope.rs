//! Document envelope for lightweight first-pass deserialization.

use serde::{Deserialize, Serialize};

use super::{CommonMetadata, Document, DocumentKind, RulesetDocument};
use crate::scoring::ScoringProfilesDocument;

/// Lightweight first-pass deserializer that reads only the header fields.
///
/// Used during two-pass loading: first extract `kind` to determine the
/// concrete type, then deserialize the full document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEnvelope {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    /// Remaining fields captured as raw YAML for second-pass deserialization.
    #[serde(flatten)]
    pub rest: serde_yaml::Value,
}

impl DocumentEnvelope {
    /// Parse the `kind` field into a typed [`DocumentKind`].
    pub fn document_kind(&self) -> std::result::Result<DocumentKind, String> {
        self.kind.parse()
    }

    /// Two-pass: reconstruct the full YAML and deserialize into the concrete type.
    pub fn parse_full(&self) -> std::result::Result<Document, String> {
        let yaml = serde_yaml::to_string(self).map_err(|e| e.to_string())?;
        match self.document_kind()? {
            DocumentKind::Ruleset => {
                let doc: RulesetDocument =
                    serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;
                Ok(Document::Ruleset(doc))
            }
            DocumentKind::ScoringProfiles => {
                let doc: ScoringProfilesDocument =
                    serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;
                Ok(Document::ScoringProfiles(doc))
            }
        }
    }
}
