//! Ruleset validation with structured errors and suggestions.
//!
//! Where compilation stops at the first defect, validation walks the whole
//! ruleset and reports every problem it finds, including defects in inactive
//! rules that would break compilation once they are switched on.
//! Returns a [`ValidationResult`] with errors (block save) and warnings (advisory).

mod ruleset_checks;

pub mod fuzzy;

use serde::{Deserialize, Serialize};

use valuator_core::EngineConfig;

use crate::schema::{RulesetDocument, Ruleset};

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// JSON-path-like location, e.g. `"groups[0].rules[2].condition"`.
    pub path: String,
    pub message: String,
    /// Optional "Did you mean …?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    pub(crate) fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate a ruleset snapshot under the limits of `config`.
pub fn validate_ruleset(ruleset: &Ruleset, config: &EngineConfig) -> ValidationResult {
    let mut result = ValidationResult::new();
    ruleset_checks::validate_header(ruleset, &mut result);
    ruleset_checks::validate_groups(ruleset, &mut result);
    ruleset_checks::validate_rules(ruleset, config, &mut result);
    result
}

/// Parse a `kind: Ruleset` YAML document and validate it. Parse errors are
/// reported as a single error at the root path.
pub fn validate_yaml(yaml: &str, config: &EngineConfig) -> ValidationResult {
    match RulesetDocument::from_yaml_str(yaml) {
        Ok(doc) => validate_ruleset(&doc.into_ruleset(), config),
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error("", e.to_string());
            result
        }
    }
}
