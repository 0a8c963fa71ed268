//! Valuation rule engine.
//!
//! This crate provides:
//! - Serde data model for rulesets, rule groups, conditions, and actions,
//!   loadable from YAML documents
//! - Compiled rulesets with AND/OR/NOT condition trees and typed predicates
//! - A restricted formula language (recursive-descent parser + interpreter)
//! - The action engine and per-item orchestrator producing a [`Breakdown`]
//! - Weighted scoring over named weighting profiles
//! - Validation reports with "did you mean" suggestions
//! - Bulk evaluation on a rayon worker pool

pub mod breakdown;
pub mod bulk;
pub mod error;
pub mod evaluator;
pub mod formula;
pub mod schema;
pub mod scoring;
pub mod validation;

pub use breakdown::{ActionAmount, Breakdown, BreakdownEntry, EntryStatus, GroupSummary};
pub use bulk::{BulkEvaluator, BulkItem, BulkOutcome, BulkReport, BulkResult};
pub use error::{
    ActionError, BulkError, DocumentError, EvaluationError, RuleDefinitionError, ScoringError,
};
pub use evaluator::{
    evaluate_condition, evaluate_item, ActionBasis, CompiledAction, CompiledCondition,
    CompiledRuleset, RuleEvaluator,
};
pub use formula::{Formula, FormulaError, FormulaEvaluationError, FormulaParseError};
pub use schema::{
    Action, ActionKind, Condition, Document, Modifier, MultiplierBasis, Operator, Rule, RuleGroup,
    Ruleset, RulesetDocument,
};
pub use scoring::{
    default_weights, score, score_profiles, GroupWeights, ScoringProfilesDocument,
    WeightingProfile,
};
pub use validation::{validate_ruleset, validate_yaml, ValidationResult};
