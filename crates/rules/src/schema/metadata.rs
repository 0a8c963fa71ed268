//! Common metadata shared across document kinds.

use serde::{Deserialize, Serialize};

/// Shared metadata for rulesets and scoring profile documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommonMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Snapshot version. Edits to a referenced ruleset produce a new version.
    #[serde(default = "default_version")]
    pub version: u32,
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_version() -> u32 {
    1
}
