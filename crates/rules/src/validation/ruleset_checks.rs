//! Ruleset checks: header, groups, rule conditions, and actions.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use valuator_core::EngineConfig;

use super::fuzzy::{fuzzy_match, is_kebab_case};
use super::ValidationResult;
use crate::error::RuleDefinitionError;
use crate::evaluator::{compile_predicate, CompiledAction};
use crate::formula::Formula;
use crate::schema::*;

// ── Header ──────────────────────────────────────────────────────────

pub(super) fn validate_header(ruleset: &Ruleset, result: &mut ValidationResult) {
    if ruleset.id.trim().is_empty() {
        result.error("id", "Ruleset id must not be empty");
    } else if !is_kebab_case(&ruleset.id) {
        result.warn("id", format!("Ruleset id '{}' is not kebab-case", ruleset.id));
    }
    if ruleset.name.trim().is_empty() {
        result.error("name", "Ruleset name must not be empty");
    }
    if ruleset.groups.is_empty() {
        result.warn("groups", "Ruleset has no groups");
    }
}

// ── Groups ──────────────────────────────────────────────────────────

pub(super) fn validate_groups(ruleset: &Ruleset, result: &mut ValidationResult) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut active_weight = Decimal::ZERO;
    let mut active_groups = 0;

    for (i, group) in ruleset.groups.iter().enumerate() {
        let path = format!("groups[{i}]");

        if group.name.trim().is_empty() {
            result.error(format!("{path}.name"), "Group name must not be empty");
        } else if !seen.insert(group.name.as_str()) {
            result.error(
                format!("{path}.name"),
                format!("Duplicate group name '{}'", group.name),
            );
        }

        if group.weight.is_sign_negative() && !group.weight.is_zero() {
            result.error(
                format!("{path}.weight"),
                format!("Group weight must be non-negative, got {}", group.weight),
            );
        }

        if group.active {
            active_groups += 1;
            active_weight = active_weight.saturating_add(group.weight);
        }
    }

    if active_groups > 0 && active_weight.is_zero() {
        result.warn(
            "groups",
            "Active group weights sum to zero; every composite score will be 0",
        );
    }
}

// ── Rules ───────────────────────────────────────────────────────────

pub(super) fn validate_rules(
    ruleset: &Ruleset,
    config: &EngineConfig,
    result: &mut ValidationResult,
) {
    let mut first_seen: HashMap<u64, String> = HashMap::new();

    for (gi, group) in ruleset.groups.iter().enumerate() {
        for (ri, rule) in group.rules.iter().enumerate() {
            let path = format!("groups[{gi}].rules[{ri}]");

            if let Some(previous) = first_seen.get(&rule.id) {
                result.warn(
                    format!("{path}.id"),
                    format!("Rule id {} is also used at {previous}", rule.id),
                );
            } else {
                first_seen.insert(rule.id, path.clone());
            }

            if rule.name.trim().is_empty() {
                result.error(format!("{path}.name"), "Rule name must not be empty");
            }

            let condition_path = format!("{path}.condition");
            check_condition(&rule.condition, rule.id, config, 1, &condition_path, result);

            if rule.actions.is_empty() {
                result.warn(
                    format!("{path}.actions"),
                    "Rule has no actions and will never contribute",
                );
            }
            for (ai, action) in rule.actions.iter().enumerate() {
                if let Err(e) = CompiledAction::compile(action, rule.id, ai, config) {
                    result.error(format!("{path}.actions[{ai}]"), e.to_string());
                }
            }
        }
    }
}

fn check_condition(
    condition: &Condition,
    rule_id: u64,
    config: &EngineConfig,
    depth: usize,
    path: &str,
    result: &mut ValidationResult,
) {
    if depth > config.max_condition_depth {
        let e = RuleDefinitionError::DepthExceeded {
            rule_id,
            max_depth: config.max_condition_depth,
        };
        result.error(path, e.to_string());
        return;
    }

    match condition {
        Condition::Predicate(predicate) => {
            if let Err(e) = compile_predicate(predicate, rule_id) {
                report_predicate_error(e, path, result);
            }
        }
        Condition::Formula { expression } => {
            if let Err(source) = Formula::parse(expression, config) {
                let e = RuleDefinitionError::InvalidFormula {
                    rule_id,
                    expression: expression.clone(),
                    source,
                };
                result.error(format!("{path}.expression"), e.to_string());
            }
        }
        Condition::Group(group) => {
            match group.operator {
                LogicalOperator::Not if group.conditions.len() != 1 => {
                    let e = RuleDefinitionError::NotArity {
                        rule_id,
                        found: group.conditions.len(),
                    };
                    result.error(format!("{path}.conditions"), e.to_string());
                }
                LogicalOperator::Or if group.conditions.is_empty() => {
                    result.warn(path, "Empty OR group never matches");
                }
                _ => {}
            }
            for (i, child) in group.conditions.iter().enumerate() {
                let child_path = format!("{path}.conditions[{i}]");
                check_condition(child, rule_id, config, depth + 1, &child_path, result);
            }
        }
    }
}

fn report_predicate_error(e: RuleDefinitionError, path: &str, result: &mut ValidationResult) {
    match &e {
        RuleDefinitionError::UnknownOperator { operator, .. } => {
            let path = format!("{path}.operator");
            match fuzzy_match(operator, KNOWN_OPERATORS) {
                Some(s) => result.error_with_suggestion(
                    path,
                    e.to_string(),
                    format!("Did you mean '{s}'?"),
                ),
                None => result.error(
                    path,
                    format!("{e} (expected one of: {})", KNOWN_OPERATORS.join(", ")),
                ),
            }
        }
        RuleDefinitionError::EmptyField { .. } => {
            result.error(format!("{path}.field"), e.to_string())
        }
        _ => result.error(format!("{path}.value"), e.to_string()),
    }
}
