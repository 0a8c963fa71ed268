//! Error taxonomy for ruleset compilation, evaluation, and scoring.
//!
//! - [`RuleDefinitionError`]: malformed rule; fatal for the whole call.
//! - [`ActionError`] (wrapping formula runtime errors): isolated to one rule
//!   and recorded in its breakdown entry.
//! - [`ScoringError`]: invalid weighting configuration.

use rust_decimal::Decimal;

use crate::formula::{FormulaEvaluationError, FormulaParseError};

/// A structural defect in one rule. Always names the rule.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleDefinitionError {
    #[error("rule {rule_id}: unknown operator `{operator}` on field `{field}`")]
    UnknownOperator {
        rule_id: u64,
        field: String,
        operator: String,
    },

    #[error("rule {rule_id}: invalid operand for `{operator}` on field `{field}`: {reason}")]
    InvalidOperand {
        rule_id: u64,
        field: String,
        operator: String,
        reason: String,
    },

    #[error("rule {rule_id}: predicate has an empty field path")]
    EmptyField { rule_id: u64 },

    #[error("rule {rule_id}: NOT group must have exactly one child condition, found {found}")]
    NotArity { rule_id: u64, found: usize },

    #[error("rule {rule_id}: condition nesting exceeds the maximum depth of {max_depth}")]
    DepthExceeded { rule_id: u64, max_depth: usize },

    #[error("rule {rule_id}: action #{index} ({kind}): {reason}")]
    InvalidAction {
        rule_id: u64,
        index: usize,
        kind: String,
        reason: String,
    },

    #[error("rule {rule_id}: formula `{expression}` rejected: {source}")]
    InvalidFormula {
        rule_id: u64,
        expression: String,
        #[source]
        source: FormulaParseError,
    },
}

impl RuleDefinitionError {
    /// The offending rule.
    pub fn rule_id(&self) -> u64 {
        match self {
            RuleDefinitionError::UnknownOperator { rule_id, .. }
            | RuleDefinitionError::InvalidOperand { rule_id, .. }
            | RuleDefinitionError::EmptyField { rule_id }
            | RuleDefinitionError::NotArity { rule_id, .. }
            | RuleDefinitionError::DepthExceeded { rule_id, .. }
            | RuleDefinitionError::InvalidAction { rule_id, .. }
            | RuleDefinitionError::InvalidFormula { rule_id, .. } => *rule_id,
        }
    }
}

/// Fatal error for an evaluation call. No breakdown is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Definition(#[from] RuleDefinitionError),

    #[error("ruleset `{ruleset_id}` has more than one group named `{group}`")]
    DuplicateGroup { ruleset_id: String, group: String },
}

impl EvaluationError {
    /// Rule id for definition errors, `None` for ruleset-level errors.
    pub fn rule_id(&self) -> Option<u64> {
        match self {
            EvaluationError::Definition(e) => Some(e.rule_id()),
            EvaluationError::DuplicateGroup { .. } => None,
        }
    }
}

/// Runtime failure of one action. Isolated to the rule that raised it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Formula(#[from] FormulaEvaluationError),

    #[error("field `{field}` is absent")]
    MissingField { field: String },

    #[error("field `{field}` is not numeric (found {found})")]
    NonNumericField { field: String, found: &'static str },

    #[error("arithmetic overflow while computing the adjustment")]
    Overflow,
}

/// Invalid weighting configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("group `{group}` has negative weight {weight}")]
    NegativeWeight { group: String, weight: Decimal },

    #[error("profile `{profile}`: {source}")]
    Profile {
        profile: String,
        #[source]
        source: Box<ScoringError>,
    },

    #[error("arithmetic overflow while computing the composite score")]
    Overflow,
}

/// Failure loading a YAML document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("expected a `{expected}` document, found `{found}`")]
    WrongKind { expected: String, found: String },

    #[error("invalid document: {0}")]
    Invalid(String),
}

/// Failure setting up bulk evaluation.
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
